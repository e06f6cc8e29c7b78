pub fn codec(input: &[u8]) {
    // Make sure we never panic or read out of bounds when skipping
    let mut scanner = scythe_json::SkipScanner::new();
    let mut pos = 0;
    let skipped = scanner.skip_one(input, &mut pos);

    if serde_json::from_slice::<serde_json::Value>(input).is_ok() {
        // Anything serde_json accepts must skip cleanly
        skipped.expect("failed to skip a valid document");
        assert!(pos <= input.len());
    }

    // Quoting arbitrary bytes must always produce a literal that unquotes
    // back to the same bytes
    let mut literal = Vec::new();
    scythe_json::quote(input, &mut literal);

    let mut buf = literal.clone();
    let mut pos = 1;
    let len =
        scythe_json::unquote_in_place(&mut buf, &mut pos).expect("quoted output always unquotes");

    assert_eq!(input, &buf[1..1 + len]);
    assert_eq!(literal.len(), pos);
}
