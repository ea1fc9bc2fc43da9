//! Tar synthesis scenarios: archive to manifest and across domains.

use omtree::{
    Keyword, TarStreamer, WalkBuilder, compare, parse_spec, strip_tar_directory_sizes,
};

fn make_archive() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let entries: &[(&str, &[u8], tar::EntryType, u32)] = &[
        ("./", b"", tar::EntryType::Directory, 0o755),
        ("tmpfile", b"some content", tar::EntryType::Regular, 0o644),
        ("testdir/", b"", tar::EntryType::Directory, 0o755),
        ("testdir/anotherfile", b"aaa", tar::EntryType::Regular, 0o644),
    ];
    for (path, body, kind, mode) in entries {
        let mut header = tar::Header::new_ustar();
        header.set_path(path).unwrap();
        header.set_size(body.len() as u64);
        header.set_mode(*mode);
        header.set_mtime(1300000000);
        header.set_uid(0);
        header.set_gid(0);
        header.set_entry_type(*kind);
        header.set_cksum();
        builder.append(&header, *body).unwrap();
    }
    builder.into_inner().unwrap()
}

#[test]
fn synthesized_manifest_round_trips_through_text() {
    let archive = make_archive();
    let mut streamer = TarStreamer::new(&archive[..], Vec::new(), None);
    streamer.drain().expect("drain");
    let tdh = streamer.hierarchy().expect("hierarchy");

    let mut text = Vec::new();
    tdh.write_to(&mut text).expect("serialize");
    let reparsed = parse_spec(&text[..]).expect("reparse");

    let deltas = compare(Some(&tdh), Some(&reparsed), None).expect("compare");
    assert!(
        deltas.is_empty(),
        "{deltas:?}\n{}",
        String::from_utf8_lossy(&text)
    );
}

#[test]
fn archive_checks_clean_against_its_extraction() {
    let archive = make_archive();

    // Extract to a scratch tree.
    let temp = tempfile::tempdir().expect("tempdir");
    tar::Archive::new(&archive[..])
        .unpack(temp.path())
        .expect("unpack");

    // The unpack root's own mode is the tempdir's, not the archive's, so
    // the keyword set sticks to attributes extraction reproduces.
    let keys: Vec<Keyword> = ["size", "type", "sha1digest"].map(Keyword::new).into();

    let mut streamer = TarStreamer::new(&archive[..], Vec::new(), Some(keys.clone()));
    streamer.drain().expect("drain");
    let tdh = streamer.hierarchy().expect("hierarchy");

    let walked = WalkBuilder::new(temp.path())
        .keywords(keys.clone())
        .walk()
        .expect("walk");

    let mut deltas = compare(Some(&tdh), Some(&walked), Some(&keys)).expect("compare");
    // Directory sizes only exist on the filesystem side; the dedicated
    // filter strips that known artifact.
    strip_tar_directory_sizes(&mut deltas);
    assert!(deltas.is_empty(), "{deltas:?}");
}

#[test]
fn deep_archives_check_against_their_extraction_via_placeholders() {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_ustar();
    header.set_path("deep/nested/file").unwrap();
    header.set_size(4);
    header.set_mode(0o644);
    header.set_mtime(1300000000);
    header.set_uid(0);
    header.set_gid(0);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append(&header, &b"data"[..]).unwrap();
    let archive = builder.into_inner().unwrap();

    let temp = tempfile::tempdir().expect("tempdir");
    tar::Archive::new(&archive[..])
        .unpack(temp.path())
        .expect("unpack");

    let keys: Vec<Keyword> = ["type", "sha1digest"].map(Keyword::new).into();
    let mut streamer = TarStreamer::new(&archive[..], Vec::new(), Some(keys.clone()));
    streamer.drain().expect("drain");
    let tdh = streamer.hierarchy().expect("hierarchy");

    let walked = WalkBuilder::new(temp.path())
        .keywords(keys.clone())
        .walk()
        .expect("walk");

    let deltas = compare(Some(&tdh), Some(&walked), Some(&keys)).expect("compare");
    assert!(deltas.is_empty(), "{deltas:?}");
}

// One PAX record: "<len> <key>=<value>\n" where len counts the whole
// record including its own digits.
fn pax_record(key: &str, value: &str) -> String {
    let payload = format!(" {key}={value}\n");
    let mut len = payload.len();
    loop {
        let total = len.to_string().len() + payload.len();
        if total == len {
            break;
        }
        len = total;
    }
    format!("{len}{payload}")
}

#[test]
fn pax_xattrs_surface_as_xattr_keywords() {
    let mut builder = tar::Builder::new(Vec::new());

    // A PAX extended header carrying one xattr for the next file.
    let pax_body = pax_record("SCHILY.xattr.user.greeting", "hello");

    let mut pax_header = tar::Header::new_ustar();
    pax_header.set_path("._pax").unwrap();
    pax_header.set_size(pax_body.len() as u64);
    pax_header.set_entry_type(tar::EntryType::XHeader);
    pax_header.set_cksum();
    builder.append(&pax_header, pax_body.as_bytes()).unwrap();

    let mut header = tar::Header::new_ustar();
    header.set_path("f").unwrap();
    header.set_size(1);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append(&header, &b"x"[..]).unwrap();
    let archive = builder.into_inner().unwrap();

    let mut streamer = TarStreamer::new(&archive[..], Vec::new(), None);
    streamer.drain().expect("drain");
    let dh = streamer.hierarchy().expect("hierarchy");

    let mut text = Vec::new();
    dh.write_to(&mut text).unwrap();
    let text = String::from_utf8(text).unwrap();
    // sha1("hello")
    assert!(
        text.contains("xattr.user.greeting=aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"),
        "{text}"
    );
}
