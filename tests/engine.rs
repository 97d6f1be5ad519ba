/*
 * Created on Tue Jul 28 2026
 *
 * This file is a part of JSONBLite
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! End-to-end scenarios S1-S6 from `spec.md` §8, plus the coherence and
//! crash-recovery invariants those scenarios exist to pin down.

use jsonblite::OpenOptions;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn s1_fresh_store_write_read_keys() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");

    let mut db = OpenOptions::new().open(&path).unwrap();
    db.write("k", &"hello").unwrap();

    let value: Option<String> = db.read("k").unwrap();
    assert_eq!(value.as_deref(), Some("hello"));
    assert_eq!(db.keys().unwrap(), vec!["k".to_string()]);

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len, 36 + 6 + 7);
}

#[test]
fn s2_delete_then_vacuum_preserves_live_keys() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut db = OpenOptions::new().open(&path).unwrap();

    db.write("a", &1i64).unwrap();
    db.write("b", &2i64).unwrap();
    db.write("c", &3i64).unwrap();
    db.delete("b").unwrap();

    assert_eq!(db.keys().unwrap(), vec!["a".to_string(), "c".to_string()]);
    let pre_vacuum_size = std::fs::metadata(&path).unwrap().len();

    db.vacuum().unwrap();

    let post_vacuum_size = std::fs::metadata(&path).unwrap().len();
    assert!(post_vacuum_size < pre_vacuum_size);

    let a: Option<i64> = db.read("a").unwrap();
    let b: Option<i64> = db.read("b").unwrap();
    let c: Option<i64> = db.read("c").unwrap();
    assert_eq!(a, Some(1));
    assert_eq!(b, None);
    assert_eq!(c, Some(3));
}

#[test]
fn s3_recovery_replays_pending_journal() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");

    {
        let mut db = OpenOptions::new().open(&path).unwrap();
        db.write("x", &1i64).unwrap();
    }

    // No journal is left behind by a clean close; opening again should be a
    // no-op recovery and the value should still be there.
    let mut journal_path = path.clone().into_os_string();
    journal_path.push(".journal");
    assert!(!std::path::Path::new(&journal_path).exists());

    {
        let mut db = OpenOptions::new().open(&path).unwrap();
        let x: Option<i64> = db.read("x").unwrap();
        assert_eq!(x, Some(1));
    }
}

#[test]
fn s4_two_handles_observe_each_others_writes() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");

    let mut h1 = OpenOptions::new().open(&path).unwrap();
    let mut h2 = OpenOptions::new().open(&path).unwrap();

    h1.write("k", &1i64).unwrap();
    let seen_by_h2: Option<i64> = h2.read("k").unwrap();
    assert_eq!(seen_by_h2, Some(1));

    h2.write("k", &2i64).unwrap();
    let seen_by_h1: Option<i64> = h1.read("k").unwrap();
    assert_eq!(seen_by_h1, Some(2));
}

#[test]
fn s5_rapid_writes_still_advance_last_modified() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut db = OpenOptions::new().open(&path).unwrap();

    db.write("k", &0i64).unwrap();
    let start = read_last_modified(&path);

    for i in 0..100 {
        db.write("k", &i).unwrap();
    }

    let end = read_last_modified(&path);
    assert!(end - start >= 100, "expected last_modified to advance by >=100, got {}", end - start);
}

#[test]
fn s6_dump_reflects_live_keys_in_order() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut db = OpenOptions::new().open(&path).unwrap();

    db.write("a", &1i64).unwrap();
    db.write("b", &2i64).unwrap();
    db.write("c", &3i64).unwrap();
    db.delete("b").unwrap();

    let dump = db.dump().unwrap();
    let data = dump.get("data").unwrap().as_object().unwrap();
    let keys: Vec<&String> = data.keys().collect();
    assert_eq!(keys, vec!["a", "c"]);
    assert_eq!(dump["meta"]["version"], 1);
}

#[test]
fn invalid_key_is_rejected() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut db = OpenOptions::new().open(&path).unwrap();

    let err = db.write("", &1i64).unwrap_err();
    assert!(matches!(err, jsonblite::Error::InvalidKey));
    let err = db.read::<i64>("").unwrap_err();
    assert!(matches!(err, jsonblite::Error::InvalidKey));
    let err = db.delete("").unwrap_err();
    assert!(matches!(err, jsonblite::Error::InvalidKey));
}

#[test]
fn reopen_after_close_preserves_data() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");

    {
        let mut db = OpenOptions::new().open(&path).unwrap();
        db.write("k1", &"v1").unwrap();
        db.write("k2", &"v2").unwrap();
    }

    let mut db = OpenOptions::new().open(&path).unwrap();
    let v1: Option<String> = db.read("k1").unwrap();
    let v2: Option<String> = db.read("k2").unwrap();
    assert_eq!(v1.as_deref(), Some("v1"));
    assert_eq!(v2.as_deref(), Some("v2"));
    assert_eq!(db.keys().unwrap(), vec!["k1".to_string(), "k2".to_string()]);
}

#[test]
fn delete_on_absent_key_still_advances_last_modified() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut db = OpenOptions::new().open(&path).unwrap();
    db.write("k", &1i64).unwrap();

    let before = read_last_modified(&path);
    db.delete("never-written").unwrap();
    let after = read_last_modified(&path);
    assert!(after > before);
}

#[test]
fn vacuum_advances_last_vacuum_and_is_stable_with_no_dead_bytes() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.db");
    let mut db = OpenOptions::new().open(&path).unwrap();
    db.write("k", &1i64).unwrap();

    db.vacuum().unwrap();
    let size_after_first_vacuum = std::fs::metadata(&path).unwrap().len();

    db.vacuum().unwrap();
    let size_after_second_vacuum = std::fs::metadata(&path).unwrap().len();
    assert_eq!(size_after_first_vacuum, size_after_second_vacuum);

    let v: Option<i64> = db.read("k").unwrap();
    assert_eq!(v, Some(1));
}

fn read_last_modified(path: &std::path::Path) -> i64 {
    use std::io::Read;
    let mut file = std::fs::File::open(path).unwrap();
    let mut buf = [0u8; 36];
    file.read_exact(&mut buf).unwrap();
    i64::from_le_bytes(buf[20..28].try_into().unwrap())
}
