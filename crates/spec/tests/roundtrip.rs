//! Round-trip properties of the parser and serializer.

use omtree_spec::parse_spec;
use proptest::prelude::*;

fn serialize(dh: &omtree_spec::DirectoryHierarchy) -> Vec<u8> {
    let mut out = Vec::new();
    dh.write_to(&mut out).expect("writing to a Vec cannot fail");
    out
}

#[test]
fn byte_exact_round_trip_with_comments_and_blanks() {
    let input = concat!(
        "#mtree v2.0\n",
        "#   machine: example\n",
        "\n",
        "/set type=file uid=0 gid=0\n",
        ". type=dir mode=0755\n",
        "\t#file2 with a tab-indented comment\n",
        "    hello size=5 sha1digest=aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d\n",
        "sub type=dir\n",
        "    inner size=0\n",
        "..\n",
        "\n",
        "..\n",
    )
    .as_bytes();
    // The final ".." closes ".", leaving no directory open.
    let dh = parse_spec(input).expect("fixture parses");
    assert_eq!(serialize(&dh), input);
}

#[test]
fn whitespace_only_lines_survive() {
    let input: &[u8] = b". type=dir\n   \t\n    f type=file\n..\n";
    let dh = parse_spec(input).expect("fixture parses");
    assert_eq!(serialize(&dh), input);
}

#[test]
fn encoded_names_are_not_decoded_on_output() {
    let input = b". type=dir\n    with\\040space type=file\n..\n";
    let dh = parse_spec(&input[..]).expect("fixture parses");
    assert_eq!(serialize(&dh), input);
}

// A small grammar of well-formed manifests: every generated manifest must
// serialize back to the exact input bytes.
fn manifest_strategy() -> impl Strategy<Value = String> {
    let name = "[a-z][a-z0-9._-]{0,8}";
    let comment = "#[ -~]{0,30}".prop_map(|c| format!("{c}\n"));
    let blank = Just("\n".to_owned());
    let set = (1u32..1000, 1u32..1000).prop_map(|(uid, gid)| format!("/set uid={uid} gid={gid}\n"));
    let unset = Just("/unset\n".to_owned());
    let file = (name, 0u64..4096)
        .prop_map(|(n, size)| format!("    {n} type=file size={size}\n"));

    let line = prop_oneof![comment, blank, set, unset, file];
    proptest::collection::vec(line, 0..20).prop_map(|lines| {
        let mut text = String::from("#mtree v2.0\n");
        for line in lines {
            text.push_str(&line);
        }
        text
    })
}

proptest! {
    #[test]
    fn generated_manifests_round_trip_exactly(input in manifest_strategy()) {
        let dh = parse_spec(input.as_bytes()).expect("generated manifest parses");
        prop_assert_eq!(serialize(&dh), input.into_bytes());
    }

    // Arbitrary printable soup: if it parses at all, one serialization
    // pass reaches a fixed point.
    #[test]
    fn serialization_is_a_fixed_point(input in "[ -~\n\t]{0,200}") {
        if let Ok(dh) = parse_spec(input.as_bytes()) {
            let first = serialize(&dh);
            if let Ok(reparsed) = parse_spec(&first[..]) {
                prop_assert_eq!(serialize(&reparsed), first);
            }
        }
    }
}
