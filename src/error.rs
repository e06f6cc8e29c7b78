use thiserror::Error;

/**
An error encountered while decoding or skipping through a JSON buffer.

Errors carry the byte offset at which scanning stopped so callers can point
back into the source document.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /**
    A control byte (`0x00..=0x1f`) appeared raw inside a string literal.
    */
    #[error("unescaped control byte {byte:#04x} in string at offset {offset}")]
    UnescapedControlByte { byte: u8, offset: usize },

    /**
    A `\` was followed by a byte that doesn't begin a valid escape sequence.
    */
    #[error("invalid escape `\\{}` at offset {offset}", *escape as char)]
    InvalidEscapeFormat { escape: u8, offset: usize },

    /**
    A `\u` escape was truncated, had non-hex digits, or encoded an invalid
    surrogate pair.
    */
    #[error("invalid unicode escape at offset {offset}")]
    InvalidUnicodeEscape { offset: usize },

    /**
    The input ended before the closing `"` of a string literal.
    */
    #[error("unclosed string starting at offset {offset}")]
    UnclosedString { offset: usize },

    /**
    The input ended before a `{`/`[` was balanced by its closing byte.
    */
    #[error("unclosed container starting at offset {offset}")]
    UnclosedContainer { offset: usize },

    /**
    A bare token wasn't one of `true`, `false` or `null`.
    */
    #[error("invalid literal at offset {offset}")]
    InvalidLiteral { offset: usize },
}
