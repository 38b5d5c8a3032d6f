use gauprep::deck::DeckComposer;
use gauprep::settings::Settings;
use gauprep::structure_reader::{read_single_file, StructureError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_gaussian_input_to_deck() {
    let input = r#"%chk=old.chk
%mem=4GB
#p opt b3lyp/def2svp

Pd(PPh3) fragment, previous run

0 1
 Pd   0.000000   0.000000   0.000000
 P    2.300000   0.000000   0.000000
 H    3.000000   1.200000   0.000000

B 1 2 F

"#;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pd_fragment.com");
    fs::write(&path, input).unwrap();

    let data = read_single_file(&path).unwrap();
    assert_eq!((data.charge, data.multiplicity), (0, 1));
    assert_eq!(data.structure.len(), 3);
    assert_eq!(data.structure[0], "Pd   0.000000   0.000000   0.000000");

    let mut config = data.into_configuration().unwrap();
    config.options.set("job_type", "opt").unwrap();
    config.options.set("basis_h_ecp", "LANL2DZ").unwrap();

    let output = dir.path().join("pd_fragment.gjf");
    let deck = DeckComposer::new(&Settings::default())
        .write(&config, &output)
        .unwrap();
    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text, deck.render());
    assert!(text.contains("%chk=pd_fragment.chk\n"));
    assert!(text.contains("Gen Pseudo=read"));
    assert!(text.contains("H P 0\ndef2SVP\n****\nPd 0\nLANL2DZ\n****\n\nPd 0\nLANL2DZ\n"));
}

#[test]
fn test_open_shell_log_structure() {
    let log = "\
 Charge =  0 Multiplicity = 3
                          Standard orientation:
 ---------------------------------------------------------------------
 Center     Atomic      Atomic             Coordinates (Angstroms)
 Number     Number       Type             X           Y           Z
 ---------------------------------------------------------------------
      1          8           0        0.000000    0.000000    0.603500
      2          8           0        0.000000    0.000000   -0.603500
 ---------------------------------------------------------------------
 SCF Done:  E(UB3LYP) =  -150.320000000     A.U. after   10 cycles
";
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("o2.LOG");
    fs::write(&path, log).unwrap();

    let config = read_single_file(&path).unwrap().into_configuration().unwrap();
    assert!(config.is_open_shell());
    assert_eq!(config.structure().len(), 2);
    assert!(config.structure()[1].starts_with("O          "));
    assert!(config.structure()[1].ends_with("   -0.603500"));
}

#[test]
fn test_malformed_xyz_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.xyz");
    fs::write(&path, "two\ncomment\nH 0 0 0\nH 0 0 0.74\n").unwrap();

    match read_single_file(&path) {
        Err(StructureError::Parse(message)) => assert!(message.contains("atom count")),
        other => panic!("expected a parse error, got {:?}", other),
    }
}
