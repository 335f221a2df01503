use aeroglo::{ExportOpts, merge_files, parse_glo};

const FILE1: &str = "\
#define COLOR1 10, 10, 10
sub (sub1)
end
defsub (sub1)
color (COLOR1)
endsub";

const FILE2: &str = "\
#define COLOR1 20, 20, 20
sub (sub1)
end
defsub (sub1)
color (COLOR1)
endsub";

const MERGED: &[&str] = &[
    "#define G0_COLOR1 10, 10, 10",
    "sub (G0_sub1)",
    "#define G1_COLOR1 20, 20, 20",
    "sub (G1_sub1)",
    "end",
    "defsub (G0_sub1)",
    "color (G0_COLOR1)",
    "endsub",
    "defsub (G1_sub1)",
    "color (G1_COLOR1)",
    "endsub",
];

#[test]
fn namespaced_files_merge_side_by_side() {
    let mut glo1 = parse_glo(FILE1).unwrap();
    glo1.add_namespace("G0_").unwrap();
    let mut glo2 = parse_glo(FILE2).unwrap();
    glo2.add_namespace("G1_").unwrap();
    glo1.merge(glo2).unwrap();

    assert_eq!(glo1.export(&ExportOpts::default()), MERGED.join("\n"));
}

#[test]
fn merge_files_applies_positional_prefixes() {
    let files = vec![parse_glo(FILE1).unwrap(), parse_glo(FILE2).unwrap()];
    let merged = merge_files(files).unwrap();
    assert_eq!(merged.export(&ExportOpts::default()), MERGED.join("\n"));
    assert_eq!(merged.subroutines().len(), 2);
}

#[test]
fn merging_without_namespaces_collides() {
    let mut glo1 = parse_glo(FILE1).unwrap();
    let glo2 = parse_glo(FILE2).unwrap();
    assert!(glo1.merge(glo2).is_err());
}
