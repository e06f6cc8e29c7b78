use rand::Rng;
use std::fmt::Write;

/**
Generate a complete JSON value with whitespace sprinkled between tokens.

Fuzzing is good at finding bizarre almost-JSON but rarely produces valid
documents, so these stampede the skip and scan routines with correct
inputs instead: nested containers, strings full of escapes, numbers in
every notation, and random runs of the four whitespace bytes anywhere
the grammar allows them.
*/
pub fn json_value() -> String {
    let mut s = String::new();
    let mut d = 0;

    write_any(&mut s, &mut d);

    s
}

/**
Generate raw string content worth escaping: quotes, backslashes, control
characters and multi-byte sequences mixed into plain text.
*/
pub fn string_payload() -> String {
    let mut s = String::new();

    for _ in 0..rng(60) {
        match rng(16) {
            0 => s.push('"'),
            1 => s.push('\\'),
            2 => s.push('/'),
            3 => {
                let control = char::from_u32(rng(0x20) as u32).expect("control chars are chars");
                s.push(control);
            }
            4 => s.push('é'),
            5 => s.push('壁'),
            6 => s.push('😄'),
            _ => {
                let i = rng(ALPHANUM.len());
                s.push_str(&ALPHANUM[i..i + 1]);
            }
        }
    }

    s
}

fn write_any(s: &mut String, d: &mut usize) {
    if *d < 8 {
        match rng(6) {
            0 => write_object(s, d),
            1 => write_array(s, d),
            2 => write_bool(s),
            3 => write_number(s),
            4 => write_null(s),
            5 => write_string(s),
            _ => unreachable!(),
        }
    } else {
        match rng(4) {
            0 => write_bool(s),
            1 => write_number(s),
            2 => write_null(s),
            3 => write_string(s),
            _ => unreachable!(),
        }
    }
}

fn write_object(s: &mut String, d: &mut usize) {
    *d += 1;
    s.push('{');

    let mut first = true;
    for _ in 0..rng(6) {
        if !first {
            s.push(',');
        }
        first = false;

        ws(s);
        write_string(s);
        ws(s);
        s.push(':');
        ws(s);
        write_any(s, d);
    }

    ws(s);
    s.push('}');
    *d -= 1;
}

fn write_array(s: &mut String, d: &mut usize) {
    *d += 1;
    s.push('[');

    let mut first = true;
    for _ in 0..rng(6) {
        if !first {
            s.push(',');
        }
        first = false;

        ws(s);
        write_any(s, d);
    }

    ws(s);
    s.push(']');
    *d -= 1;
}

fn write_null(s: &mut String) {
    s.push_str("null");
}

fn write_bool(s: &mut String) {
    if rng_bool() {
        s.push_str("true");
    } else {
        s.push_str("false");
    }
}

fn write_string(s: &mut String) {
    if rng(10) == 0 {
        // a surrogate pair escape serde_json only ever reads
        s.push_str(r#""smile \ud83d\ude04""#);
        return;
    }

    let escaped = serde_json::to_string(&string_payload()).expect("strings encode");
    s.push_str(&escaped);
}

fn write_number(s: &mut String) {
    if rng_bool() {
        s.push('-');
    }

    match rng(3) {
        0 => write!(s, "{}", rng_u32()).unwrap(),
        // keep precision low enough that floats roundtrip
        1 => write!(s, "{}.{}", rng_u32(), rng(300)).unwrap(),
        2 => {
            let e = match rng(4) {
                0 => "e",
                1 => "e-",
                2 => "E",
                3 => "E-",
                _ => unreachable!(),
            };
            write!(s, "{}.{}{}{}", rng(10), rng(300), e, rng(7)).unwrap()
        }
        _ => unreachable!(),
    }
}

fn ws(s: &mut String) {
    for _ in 0..rng(4) {
        s.push(match rng(4) {
            0 => ' ',
            1 => '\t',
            2 => '\n',
            _ => '\r',
        });
    }
}

fn rng(to: usize) -> usize {
    rand::thread_rng().gen_range(0..to)
}

fn rng_bool() -> bool {
    rand::random()
}

fn rng_u32() -> u32 {
    rand::random()
}

const ALPHANUM: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";
