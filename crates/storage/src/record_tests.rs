// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn round_trips_a_single_record() {
    let mut r = Record::new("unit");
    r.set("id", "a.service").unwrap();
    r.set_bool("failed_latch", true).unwrap();
    r.set_u64("refs", 3).unwrap();
    r.set_hex("blob", &[0xde, 0xad, 0xbe, 0xef]).unwrap();
    r.set_fd_ref("stdout_fd", 2).unwrap();

    let text = write_records(&[r]).unwrap();
    let parsed = parse_records(&text).unwrap();
    assert_eq!(parsed.len(), 1);
    let p = &parsed[0];
    assert_eq!(p.kind, "unit");
    assert_eq!(p.get("id"), Some("a.service"));
    assert_eq!(p.get_bool("failed_latch"), Some(true));
    assert_eq!(p.get_u64("refs").unwrap(), Some(3));
    assert_eq!(p.get_hex("blob").unwrap(), Some(vec![0xde, 0xad, 0xbe, 0xef]));
    assert_eq!(p.get_fd_ref("stdout_fd").unwrap(), Some(2));
}

#[test]
fn round_trips_multiple_records_separated_by_blank_lines() {
    let mut a = Record::new("unit");
    a.set("id", "a.service").unwrap();
    let mut b = Record::new("job");
    b.set("id", "job_1").unwrap();

    let text = write_records(&[a, b]).unwrap();
    let parsed = parse_records(&text).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].kind, "unit");
    assert_eq!(parsed[1].kind, "job");
}

#[test]
fn escapes_embedded_newlines_so_they_cannot_split_a_record() {
    let mut r = Record::new("unit");
    r.set("description", "line one\nline two").unwrap();
    let text = write_records(&[r]).unwrap();

    // A literal embedded newline would otherwise look like a blank-line
    // record terminator; escaping prevents that split.
    assert_eq!(parse_records(&text).unwrap().len(), 1);
    let parsed = parse_records(&text).unwrap();
    assert_eq!(parsed[0].get("description"), Some("line one\nline two"));
}

#[test]
fn unknown_keys_survive_a_round_trip_unharmed() {
    let text = "TYPE=unit\nid=a.service\nsome_future_key=surprise\n\n";
    let parsed = parse_records(text).unwrap();
    assert_eq!(parsed[0].get("some_future_key"), Some("surprise"));
}

#[test]
fn overflowing_line_is_rejected() {
    let mut r = Record::new("unit");
    let huge = "x".repeat(MAX_LINE_BYTES + 1);
    let err = r.set("big", huge).unwrap_err();
    assert!(matches!(err, SerializationError::Overflow { .. }));
}

#[test]
fn malformed_hex_is_rejected() {
    let text = "TYPE=unit\nblob=zz\n\n";
    let parsed = parse_records(text).unwrap();
    let err = parsed[0].get_hex("blob").unwrap_err();
    assert!(matches!(err, SerializationError::BadEncoding { encoding: "hex", .. }));
}

#[test]
fn missing_equals_sign_is_rejected() {
    let text = "TYPE=unit\nmalformed-line-no-separator\n\n";
    let err = parse_records(text).unwrap_err();
    assert!(matches!(err, SerializationError::BadEncoding { .. }));
}

#[test]
fn fd_ref_parsing_distinguishes_from_bare_numeric_fd() {
    let mut r = Record::new("fdstore-entry");
    r.set("fd", "7").unwrap();
    assert_eq!(r.get_fd_ref("fd").unwrap(), None);
    assert_eq!(r.get_u64("fd").unwrap(), Some(7));

    let mut r2 = Record::new("fdstore-entry");
    r2.set_fd_ref("fd", 7).unwrap();
    assert_eq!(r2.get_fd_ref("fd").unwrap(), Some(7));
}
