use std::{fs, process::Command};

use record_flatten::{
    conversion::{self, ConversionConfig},
    BatchError,
};
use tempfile::tempdir;

fn run_binary_in(dir: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_record-flatten"))
        .current_dir(dir)
        .output()
        .expect("Unable to run the record-flatten binary")
}

#[test]
fn malformed_xml_writes_no_csv() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("export.xml");
    let output = dir.path().join("output.csv");
    fs::write(&input, r#"<Export><Record id="1" name="A"></Export>"#)?;

    let config = ConversionConfig::default()
        .input_path(&input)
        .output_path(&output);
    let result = conversion::run(&config);

    match result {
        Err(BatchError::XmlParse(message)) => assert!(!message.is_empty()),
        other => panic!("expected an XML parse error, got {:?}", other),
    }
    assert!(!output.exists());
    Ok(())
}

#[test]
fn malformed_xml_keeps_previous_output() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("export.xml");
    let output = dir.path().join("output.csv");
    fs::write(&input, "<Export><Record id=\"1\"/>")?;
    fs::write(&output, "previous\n")?;

    let config = ConversionConfig::default()
        .input_path(&input)
        .output_path(&output);

    assert!(conversion::run(&config).is_err());
    assert_eq!(fs::read_to_string(&output)?, "previous\n");
    Ok(())
}

#[test]
fn missing_input_is_a_parse_error() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let config = ConversionConfig::default()
        .input_path(dir.path().join("absent.xml"))
        .output_path(dir.path().join("output.csv"));

    assert!(matches!(conversion::run(&config), Err(BatchError::XmlParse(_))));
    assert!(!dir.path().join("output.csv").exists());
    Ok(())
}

#[test]
fn unwritable_output_is_a_writer_error() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("export.xml");
    fs::write(&input, r#"<Export><Record id="1"/></Export>"#)?;

    let config = ConversionConfig::default()
        .input_path(&input)
        .output_path(dir.path().join("missing-dir").join("output.csv"));

    assert!(matches!(conversion::run(&config), Err(BatchError::ItemWriter(_))));
    Ok(())
}

#[test]
fn binary_converts_fixed_paths() -> anyhow::Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("export.xml"),
        r#"<Export><Record id="1" name="A"><MetadataEntry key="color" value="red"/></Record><Record id="2" name="B"/></Export>"#,
    )?;
    fs::write(dir.path().join("output.csv"), "stale\n")?;

    let result = run_binary_in(dir.path());

    assert!(result.status.success());
    assert_eq!(
        String::from_utf8(result.stdout)?,
        "CSV file saved as output.csv\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("output.csv"))?,
        "id,name,Metadata_color\n1,A,red\n2,B,\n"
    );
    Ok(())
}

#[test]
fn binary_reports_parse_errors() -> anyhow::Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("export.xml"), "<Export><Record>")?;

    let result = run_binary_in(dir.path());

    assert!(!result.status.success());
    assert!(String::from_utf8(result.stdout)?.starts_with("Error parsing XML: "));
    assert!(!dir.path().join("output.csv").exists());
    Ok(())
}
