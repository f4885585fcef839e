//! Whole builds, from document text to an archive on disk

use proptest::prelude::*;
use quizmark_parser::quizmark::testing::Samples;
use quizmark_qti::context::{BuildContext, BuildEvent, MemorySink};
use quizmark_qti::error::ResourceIssueKind;
use quizmark_qti::manifest::referenced_files;
use quizmark_qti::resources::packaged_name;
use quizmark_qti::{convert, BuildError, ConvertOptions};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use zip::ZipArchive;

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|e| panic!("{} missing: {}", name, e))
        .read_to_string(&mut text)
        .unwrap();
    text
}

#[test]
fn complete_document_becomes_one_archive() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("bio.zip");
    let sample = Samples::complete();
    let report = convert(
        &sample.source(),
        &ConvertOptions::new(&output, sample.base_dir()),
        &BuildContext::default(),
    )
    .unwrap();
    assert_eq!(report.package.path, output);

    let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert_eq!(archive.by_index(0).unwrap().name(), "imsmanifest.xml");
    assert_eq!(names.iter().filter(|n| n.ends_with("-item.xml")).count(), 16);
    assert!(names.contains(&"resources/BIO_Q009-cell.png".to_string()));
    assert!(names.contains(&"BIO_REVIEW-assessment.xml".to_string()));
    assert_eq!(names.len(), 19);

    let manifest = read_entry(&mut archive, "imsmanifest.xml");
    let referenced: HashSet<String> = referenced_files(&manifest).unwrap().into_iter().collect();
    for name in &names {
        if name != "imsmanifest.xml" {
            assert!(referenced.contains(name), "{} is not in the manifest", name);
        }
    }

    // media references point into the package
    let hotspot = read_entry(&mut archive, "BIO_Q009-item.xml");
    assert!(hotspot.contains("data=\"resources/BIO_Q009-cell.png\""));
    let info = read_entry(&mut archive, "BIO_Q015-item.xml");
    assert!(info.contains("src=\"resources/BIO_Q009-cell.png\""));
    assert!(!info.contains("images/cell.png"));
}

#[test]
fn assessment_section_lists_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("bio.zip");
    let sample = Samples::complete();
    let report = convert(
        &sample.source(),
        &ConvertOptions::new(&output, sample.base_dir()),
        &BuildContext::default(),
    )
    .unwrap();

    let recall = &report.sections[0];
    assert_eq!(recall.identifier, "SEC_RECALL");
    assert_eq!(
        recall.candidates,
        vec!["BIO_Q001", "BIO_Q002", "BIO_Q004", "BIO_Q006"]
    );
    assert_eq!(recall.select, Some(2));
    assert!(recall.shuffle);

    let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
    let test = read_entry(&mut archive, "BIO_REVIEW-assessment.xml");
    assert!(test.contains("<selection select=\"2\"/>"));
}

#[test]
fn missing_media_blocks_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let media_root = tempfile::tempdir().unwrap();
    let output = dir.path().join("bio.zip");
    let sink = MemorySink::new();
    let ctx = BuildContext::default().with_sink(sink.clone());

    let error = convert(
        &Samples::complete().source(),
        &ConvertOptions::new(&output, media_root.path()),
        &ctx,
    )
    .unwrap_err();
    let BuildError::Resources(issues) = error else {
        panic!("expected resource errors");
    };
    assert_eq!(issues.len(), 1);
    let expected = media_root.path().join("images/cell.png");
    assert_eq!(issues[0].kind, ResourceIssueKind::NotFound);
    assert_eq!(issues[0].resolved, expected);
    assert!(issues[0]
        .message
        .contains(&expected.display().to_string()));
    assert!(!output.exists());
    assert!(sink
        .events()
        .iter()
        .all(|e| !matches!(e, BuildEvent::Packaged { .. })));
}

#[test]
fn explicit_language_wins() {
    let dir = tempfile::tempdir().unwrap();
    let sample = Samples::complete();
    let mut options = ConvertOptions::new(dir.path().join("bio.zip"), sample.base_dir());
    options.language = Some("fi".into());
    let report = convert(&sample.source(), &options, &BuildContext::default()).unwrap();
    assert_eq!(report.language, "fi");

    let mut archive = ZipArchive::new(File::open(&report.package.path).unwrap()).unwrap();
    let item = read_entry(&mut archive, "BIO_Q003-item.xml");
    assert!(item.contains(">Tosi</simpleChoice>"));
}

fn file_name() -> impl Strategy<Value = String> {
    ("[a-zA-Z0-9 _.éüø-]{1,30}", prop_oneof!["png", "jpg", "PNG", "svg"])
        .prop_map(|(stem, ext)| format!("{}.{}", stem, ext))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn packaged_names_are_injective(
        pairs in prop::collection::hash_set(("Q[0-9]{1,3}", file_name()), 1..20)
    ) {
        let mut names = HashSet::new();
        for (question, source) in &pairs {
            let name = packaged_name(question, &format!("images/{}", source), 40);
            prop_assert!(
                names.insert(name.clone()),
                "{} ({}, {}) collides",
                name,
                question,
                source
            );
        }
    }
}
