#![cfg(unstable)]
#![feature(test)]
extern crate test;

use scythe_json::{quote, str2int, unquote_in_place, utoa64, SkipScanner, StringBits};

/**
A realistic log event: a spread of short fields and one large escaped
stacktrace payload, weighing in around 10kb.
*/
fn event_10kb() -> Vec<u8> {
    let mut doc = String::from("{\"@t\":\"2026-08-29T10:32:11.0000000Z\",\"@l\":\"Error\"");

    for i in 0..40 {
        doc.push_str(&format!(
            ",\"field_{}\":\"value with some text in it {}\",\"count_{}\":{}",
            i,
            i * 37,
            i,
            i * 1729
        ));
    }

    doc.push_str(",\"@x\":\"");
    for i in 0..90 {
        doc.push_str(&format!(
            "   at Example.Pipeline.Invoke(Request request, Int32 attempt{})\\r\\n",
            i
        ));
    }
    doc.push_str("\"}");

    doc.into_bytes()
}

/**
The raw (unescaped) stacktrace payload on its own, around 2kb.
*/
fn stacktrace_2kb() -> Vec<u8> {
    let mut payload = String::new();
    for i in 0..30 {
        payload.push_str(&format!(
            "   at Example.Pipeline.Invoke(Request request, Int32 attempt{})\r\n",
            i
        ));
    }
    payload.into_bytes()
}

#[bench]
fn skip_one_10kb_event(b: &mut test::Bencher) {
    let input = event_10kb();

    b.bytes = input.len() as u64;
    b.iter(|| {
        let mut scanner = SkipScanner::new();
        let mut pos = 0;
        scanner.skip_one(&input, &mut pos).unwrap()
    })
}

#[bench]
fn read_10kb_event_value_serde_json(b: &mut test::Bencher) {
    let input = event_10kb();

    b.bytes = input.len() as u64;
    b.iter(|| {
        let v: serde_json::Value = serde_json::from_slice(&input).unwrap();
        v
    })
}

#[bench]
fn scan_instring_10kb_event(b: &mut test::Bencher) {
    let mut input = event_10kb();
    while input.len() % 64 != 0 {
        input.push(b' ');
    }

    b.bytes = input.len() as u64;
    b.iter(|| {
        let mut bits = StringBits::new();
        let mut acc = 0u64;
        for window in input.chunks_exact(64) {
            acc ^= bits.scan_window(window.try_into().unwrap());
        }
        acc
    })
}

#[bench]
fn quote_2kb_stacktrace(b: &mut test::Bencher) {
    let payload = stacktrace_2kb();

    b.bytes = payload.len() as u64;
    b.iter(|| {
        let mut dst = Vec::new();
        quote(&payload, &mut dst);
        dst
    })
}

#[bench]
fn unquote_2kb_stacktrace(b: &mut test::Bencher) {
    let payload = stacktrace_2kb();
    let mut literal = Vec::new();
    quote(&payload, &mut literal);

    b.bytes = literal.len() as u64;
    b.iter(|| {
        let mut buf = literal.clone();
        let mut pos = 1;
        unquote_in_place(&mut buf, &mut pos).unwrap()
    })
}

#[bench]
fn unquote_2kb_stacktrace_serde_json(b: &mut test::Bencher) {
    let payload = stacktrace_2kb();
    let mut literal = Vec::new();
    quote(&payload, &mut literal);

    b.bytes = literal.len() as u64;
    b.iter(|| {
        let s: String = serde_json::from_slice(&literal).unwrap();
        s
    })
}

#[bench]
fn str2int_20_digits(b: &mut test::Bencher) {
    let digits = b"12345678901234567890";

    b.iter(|| {
        let mut ndigits = digits.len();
        str2int(test::black_box(digits), &mut ndigits)
    })
}

#[bench]
fn str2int_4_digits(b: &mut test::Bencher) {
    let digits = b"1729";

    b.iter(|| {
        let mut ndigits = digits.len();
        str2int(test::black_box(digits), &mut ndigits)
    })
}

#[bench]
fn utoa64_mixed(b: &mut test::Bencher) {
    let vals = [7u64, 1729, 99_999_999, 10_000_000_000_000_000, u64::MAX];

    b.iter(|| {
        let mut dst = Vec::new();
        for &val in test::black_box(&vals) {
            utoa64(val, &mut dst);
        }
        dst
    })
}
