use super::{boundary_sizes, some};

use crate::{
    itoa64, quote, skip_string, str2int, unquote_in_place, utoa64, SkipScanner, SkipString,
    StringBits,
};

fn iterations() -> usize {
    // debug builds are slow, so just run a handful of cases
    #[cfg(debug)]
    {
        100
    }

    #[cfg(not(debug))]
    {
        2000
    }
}

#[test]
fn quote_unquote_roundtrip_generated() {
    for _ in 0..iterations() {
        let payload = some::string_payload();

        let mut literal = Vec::new();
        quote(payload.as_bytes(), &mut literal);

        // serde_json agrees the literal is valid and decodes to the payload
        let decoded: String = serde_json::from_slice(&literal)
            .unwrap_or_else(|e| panic!("decoding `{}`: {}", String::from_utf8_lossy(&literal), e));
        assert_eq!(payload, decoded);

        // and unquoting in place recovers the payload
        let mut buf = literal.clone();
        let mut pos = 1;
        let len = unquote_in_place(&mut buf, &mut pos)
            .unwrap_or_else(|e| panic!("unquoting `{}`: {}", String::from_utf8_lossy(&literal), e));

        assert_eq!(payload.as_bytes(), &buf[1..1 + len]);
        assert_eq!(literal.len(), pos);
    }
}

#[test]
fn quote_unquote_boundary_sizes() {
    for size in boundary_sizes() {
        for variant in 0..3 {
            let mut payload = vec![b'x'; size];
            match variant {
                1 if size > 0 => payload[size - 1] = b'\n',
                2 if size > 0 => payload[0] = b'"',
                _ => {}
            }

            let mut literal = Vec::new();
            quote(&payload, &mut literal);

            let decoded: String =
                serde_json::from_slice(&literal).expect("the literal is valid json");
            assert_eq!(
                payload.as_slice(),
                decoded.as_bytes(),
                "size {} variant {}",
                size,
                variant
            );

            let mut buf = literal.clone();
            let mut pos = 1;
            let len = unquote_in_place(&mut buf, &mut pos).expect("the literal unquotes");

            assert_eq!(
                payload.as_slice(),
                &buf[1..1 + len],
                "size {} variant {}",
                size,
                variant
            );
            assert_eq!(literal.len(), pos);
        }
    }
}

#[test]
fn unquote_escaped_slashes_in_urls() {
    let mut buf = br#""https:\/\/example.com\/path?q=1""#.to_vec();
    let mut pos = 1;

    let len = unquote_in_place(&mut buf, &mut pos).expect("valid literal");

    assert_eq!(&b"https://example.com/path?q=1"[..], &buf[1..1 + len]);
    assert_eq!(buf.len(), pos);
}

#[test]
fn quote_escapes_embedded_html_quotes() {
    // html attribute payloads are the common worst case for `"` density
    let src = br#"<a href="http://twitter.com/download/iphone" rel="nofollow">Twitter for iPhone</a>"#;

    let mut literal = Vec::new();
    quote(src, &mut literal);

    // every embedded quote becomes `\"`, and nothing else needs escaping
    let quotes = src.iter().filter(|&&b| b == b'"').count();
    let backslashes = literal.iter().filter(|&&b| b == b'\\').count();
    assert_eq!(quotes, backslashes);
    assert_eq!(src.len() + quotes + 2, literal.len());

    let decoded: String = serde_json::from_slice(&literal).expect("the literal is valid json");
    assert_eq!(&src[..], decoded.as_bytes());

    let mut buf = literal.clone();
    let mut pos = 1;
    let len = unquote_in_place(&mut buf, &mut pos).expect("the literal unquotes");
    assert_eq!(&src[..], &buf[1..1 + len]);
    assert_eq!(literal.len(), pos);
}

#[test]
fn skip_one_generated_documents() {
    for _ in 0..iterations() {
        let input = some::json_value();

        // keep the generator honest
        let _: serde_json::Value = serde_json::from_str(&input)
            .unwrap_or_else(|e| panic!("parsing `{}`: {}", input, e));

        let data = input.as_bytes();
        let mut scanner = SkipScanner::new();
        let mut pos = 0;

        let start = scanner
            .skip_one(data, &mut pos)
            .unwrap_or_else(|e| panic!("skipping `{}`: {}", input, e));
        assert!(start < data.len());

        // the whole value was consumed; at most whitespace remains, and a
        // root number stops at its last digit
        assert!(
            data[pos..]
                .iter()
                .all(|&b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')),
            "skipping `{}` left `{}`",
            input,
            String::from_utf8_lossy(&data[pos..])
        );
    }
}

#[test]
fn walk_object_entries() {
    // drive the skip routines the way a parser walking an object would
    let data = br#"{ "a" : {"b":1} , "c" : [1, 2, {"d": 3}] }"#;

    let mut scanner = SkipScanner::new();
    let mut pos = 0;

    assert_eq!(b'{', scanner.skip_space(data, &mut pos));

    let mut keys = Vec::new();
    loop {
        match scanner.skip_space(data, &mut pos) {
            b'"' => (),
            b'}' => break,
            other => panic!("expected a key or close, got {:?}", other as char),
        }

        let key_start = pos;
        assert_eq!(SkipString::Normal, skip_string(data, &mut pos));
        keys.push(String::from_utf8(data[key_start..pos - 1].to_vec()).expect("keys are utf8"));

        assert_eq!(b':', scanner.skip_space(data, &mut pos));
        scanner.skip_one(data, &mut pos).expect("values are valid");

        match scanner.skip_space(data, &mut pos) {
            b',' => continue,
            b'}' => break,
            other => panic!("expected a separator or close, got {:?}", other as char),
        }
    }

    assert_eq!(vec!["a", "c"], keys);
    assert_eq!(0, scanner.skip_space(data, &mut pos));
}

/**
A byte-at-a-time walk computing the same in-string mask the vectorized
scan produces: set from each opening quote through to just before its
closing quote, with escaped quotes staying inside.
*/
fn instring_oracle(data: &[u8]) -> Vec<bool> {
    let mut mask = vec![false; data.len()];

    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in data.iter().enumerate() {
        if escaped {
            escaped = false;
            mask[i] = in_string;
            continue;
        }

        if in_string {
            match byte {
                b'\\' => {
                    escaped = true;
                    mask[i] = true;
                }
                b'"' => in_string = false,
                _ => mask[i] = true,
            }
        } else if byte == b'"' {
            in_string = true;
            mask[i] = true;
        }
    }

    mask
}

#[test]
fn instring_mask_matches_scalar_walk() {
    for _ in 0..iterations() {
        let mut data = some::json_value().into_bytes();
        while data.len() % 64 != 0 {
            data.push(b' ');
        }

        let expected = instring_oracle(&data);

        let mut bits = StringBits::new();
        let mut fallback_bits = StringBits::new();
        for (w, window) in data.chunks_exact(64).enumerate() {
            let window: &[u8; 64] = window.try_into().expect("exact chunk");
            let mask = bits.scan_window(window);

            // the dispatched backend and the fallback oracle must agree
            // bit-for-bit
            // SAFETY: `window` is 64 readable bytes; `Fallback` needs no
            // target features
            let fallback_mask = unsafe {
                fallback_bits.scan_window_unchecked::<crate::simd::Fallback>(window.as_ptr())
            };
            assert_eq!(fallback_mask, mask);

            for bit in 0..64 {
                assert_eq!(
                    expected[w * 64 + bit],
                    mask & (1 << bit) != 0,
                    "bit {} of window {} scanning `{}`",
                    bit,
                    w,
                    String::from_utf8_lossy(&data)
                );
            }
        }
    }
}

#[test]
fn int_digits_roundtrip_generated() {
    for _ in 0..iterations() {
        let val: u64 = rand::random();

        let mut buf = Vec::new();
        let written = utoa64(val, &mut buf);
        assert_eq!(written, buf.len());

        let mut ndigits = buf.len();
        assert_eq!(val, str2int(&buf, &mut ndigits));
        assert_eq!(buf.len(), ndigits);

        let val = val as i64;
        let mut buf = Vec::new();
        itoa64(val, &mut buf);

        let parsed: i64 = String::from_utf8(buf)
            .expect("digits are utf8")
            .parse()
            .expect("digits parse");
        assert_eq!(val, parsed);
    }
}
