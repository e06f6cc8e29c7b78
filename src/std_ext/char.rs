use std::convert::TryFrom;

pub fn try_from_utf16_surrogate_pair(high: u16, low: u16) -> Option<char> {
    // both units must sit in their surrogate range; anything at or above
    // 0xE000 is an ordinary code unit, not a trailing surrogate
    if !is_utf16_high_surrogate(high) || !is_utf16_low_surrogate(low) {
        return None;
    }

    // Courtesy of: http://www.russellcottrell.com/greek/utilities/SurrogatePairCalculator.htm
    let code = ((high as u32 - 0xD800) * 0x400) + (low as u32 - 0xDC00) + 0x10000;

    char::try_from(code).ok()
}

pub fn is_utf16_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

pub fn is_utf16_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}
