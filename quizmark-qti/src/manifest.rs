//! IMS content package manifest
//!
//!     One `resource` per item, per media file and for the optional assessment. Items carry
//!     LOM metadata with two classification shapes:
//!
//!         labels           purpose `idea`, one taxon per label with both `id` and `entry`
//!         custom metadata  purpose `discipline`, one classification per key whose taxon
//!                          path source is the key and whose taxa carry only an `entry`
//!
//!     The assessment resource is named `TEST_<id>` so it stays apart from item resources.
//!
//!     [check] is the self-check run before an archive is finalized: the manifest parses,
//!     lists at least one item file, every item file in the package is referenced, and no two
//!     resources share an identifier.

use crate::assessment::GeneratedAssessment;
use crate::builder::XSI_NAMESPACE;
use crate::registry::GeneratedItem;
use crate::xml::{self, Element};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeSet;

pub const MANIFEST_FILE: &str = "imsmanifest.xml";
pub const ITEM_RESOURCE_TYPE: &str = "imsqti_item_xmlv2p1";
pub const TEST_RESOURCE_TYPE: &str = "imsqti_test_xmlv2p1";

const CP_NAMESPACE: &str = "http://www.imsglobal.org/xsd/imscp_v1p1";
const LOM_NAMESPACE: &str = "http://ltsc.ieee.org/xsd/LOM";
const QTI_METADATA_NAMESPACE: &str = "http://www.imsglobal.org/xsd/imsqti_metadata_v2p1";
const SCHEMA_LOCATION: &str = "http://www.imsglobal.org/xsd/imscp_v1p1 http://www.imsglobal.org/xsd/imscp_v1p1.xsd http://ltsc.ieee.org/xsd/LOM http://www.imsglobal.org/xsd/imsmd_loose_v1p3p2.xsd http://www.imsglobal.org/xsd/imsqti_metadata_v2p1 http://www.imsglobal.org/xsd/qti/qtiv2p1/imsqti_metadata_v2p1.xsd";

#[derive(Debug, Clone, PartialEq)]
pub struct PackageMetadata {
    pub identifier: String,
    pub title: String,
    pub language: String,
}

/// Package path of an item file.
pub fn item_href(identifier: &str, suffix: &str) -> String {
    format!("{}{}", identifier, suffix)
}

pub fn assessment_href(identifier: &str) -> String {
    format!("{}-assessment.xml", identifier)
}

/// Manifest resource identifier of the assessment test.
pub fn assessment_resource_id(identifier: &str) -> String {
    format!("TEST_{}", identifier)
}

fn lom(name: &str) -> Element {
    Element::new(format!("imsmd:{}", name))
}

fn lang_string(language: &str, text: &str) -> Element {
    lom("string").attr("language", language).text(text)
}

fn purpose(value: &str) -> Element {
    lom("purpose")
        .child(lom("source").text("LOMv1.0"))
        .child(lom("value").text(value))
}

fn label_classification(labels: &[String]) -> Element {
    let taxa = labels.iter().map(|label| {
        lom("taxon")
            .child(lom("id").text(label.clone()))
            .child(lom("entry").child(lang_string("x-none", label)))
    });
    lom("classification").child(purpose("idea")).child(
        lom("taxonPath")
            .child(lom("source").child(lang_string("x-none", "labels")))
            .children(taxa),
    )
}

fn custom_classification(key: &str, values: &[String]) -> Element {
    let taxa = values
        .iter()
        .map(|value| lom("taxon").child(lom("entry").child(lang_string("x-none", value))));
    lom("classification").child(purpose("discipline")).child(
        lom("taxonPath")
            .child(lom("source").child(lang_string("x-none", key)))
            .children(taxa),
    )
}

fn item_resource(
    item: &GeneratedItem,
    suffix: &str,
    language: &str,
    resource_ids: &[(String, String)],
) -> Element {
    let href = item_href(&item.identifier, suffix);
    let mut lom_root = lom("lom").child(
        lom("general")
            .child(lom("identifier").child(lom("entry").text(item.identifier.clone())))
            .child(lom("title").child(lang_string(language, &item.title))),
    );
    if !item.labels.is_empty() {
        lom_root.push(label_classification(&item.labels));
    }
    for (key, values) in &item.custom_metadata {
        lom_root.push(custom_classification(key, values));
    }

    let qti_metadata = Element::new("imsqti:qtiMetadata")
        .child(Element::new("imsqti:interactionType").text(item.interaction));

    let dependencies = item.media.iter().filter_map(|media| {
        resource_ids
            .iter()
            .find(|(_, path)| path == media)
            .map(|(id, _)| Element::new("dependency").attr("identifierref", id))
    });

    Element::new("resource")
        .attr("identifier", &item.identifier)
        .attr("type", ITEM_RESOURCE_TYPE)
        .attr("href", &href)
        .child(Element::new("metadata").child(lom_root).child(qti_metadata))
        .child(Element::new("file").attr("href", &href))
        .children(dependencies)
}

/// Build the manifest tree.
pub fn build(
    metadata: &PackageMetadata,
    items: &[GeneratedItem],
    item_suffix: &str,
    resources: &[String],
    assessment: Option<&GeneratedAssessment>,
) -> Element {
    let resource_ids: Vec<(String, String)> = resources
        .iter()
        .enumerate()
        .map(|(i, path)| (format!("RES_{:03}", i + 1), path.clone()))
        .collect();

    let mut resource_list = Element::new("resources").children(
        items
            .iter()
            .map(|item| item_resource(item, item_suffix, &metadata.language, &resource_ids)),
    );
    for (id, path) in &resource_ids {
        resource_list.push(
            Element::new("resource")
                .attr("identifier", id)
                .attr("type", "webcontent")
                .attr("href", path)
                .child(Element::new("file").attr("href", path)),
        );
    }
    if let Some(assessment) = assessment {
        let href = assessment_href(&assessment.identifier);
        resource_list.push(
            Element::new("resource")
                .attr("identifier", assessment_resource_id(&assessment.identifier))
                .attr("type", TEST_RESOURCE_TYPE)
                .attr("href", &href)
                .child(Element::new("file").attr("href", &href))
                .children(
                    assessment
                        .items
                        .iter()
                        .map(|id| Element::new("dependency").attr("identifierref", id)),
                ),
        );
    }

    Element::new("manifest")
        .attr("xmlns", CP_NAMESPACE)
        .attr("xmlns:imsmd", LOM_NAMESPACE)
        .attr("xmlns:imsqti", QTI_METADATA_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .attr("xsi:schemaLocation", SCHEMA_LOCATION)
        .attr("identifier", format!("MANIFEST_{}", metadata.identifier))
        .child(
            Element::new("metadata")
                .child(Element::new("schema").text("QTIv2.1 Package"))
                .child(Element::new("schemaversion").text("1.0.0"))
                .child(lom("lom").child(
                    lom("general").child(lom("title").child(lang_string(
                        &metadata.language,
                        &metadata.title,
                    ))),
                )),
        )
        .child(Element::new("organizations"))
        .child(resource_list)
}

/// Values of `attribute` on every `element` in a manifest, in document order.
fn attribute_values(
    manifest_xml: &str,
    element: &[u8],
    attribute: &[u8],
) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(manifest_xml);
    let mut values = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == element => {
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| err.to_string())?;
                    if attr.key.as_ref() == attribute {
                        let value = attr.unescape_value().map_err(|err| err.to_string())?;
                        values.push(value.into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(values)
}

/// Every `file href` listed in a manifest.
pub fn referenced_files(manifest_xml: &str) -> Result<Vec<String>, String> {
    attribute_values(manifest_xml, b"file", b"href")
}

/// Every `resource identifier` listed in a manifest.
pub fn resource_identifiers(manifest_xml: &str) -> Result<Vec<String>, String> {
    attribute_values(manifest_xml, b"resource", b"identifier")
}

/// Problems found by the pre-finalize self-check; empty when the manifest is sound.
pub fn check(manifest_xml: Option<&str>, package_files: &[String], item_suffix: &str) -> Vec<String> {
    let Some(manifest_xml) = manifest_xml else {
        return vec![format!("{} is missing", MANIFEST_FILE)];
    };
    let mut problems = Vec::new();
    if let Err(e) = xml::check_well_formed(manifest_xml) {
        problems.push(format!("{} is not well-formed: {}", MANIFEST_FILE, e));
        return problems;
    }
    let listed = referenced_files(manifest_xml)
        .and_then(|files| Ok((files, resource_identifiers(manifest_xml)?)));
    let (referenced, identifiers) = match listed {
        Ok((files, identifiers)) => (files.into_iter().collect::<BTreeSet<_>>(), identifiers),
        Err(e) => {
            problems.push(format!("{} could not be read: {}", MANIFEST_FILE, e));
            return problems;
        }
    };

    let items: Vec<&String> = package_files
        .iter()
        .filter(|f| f.ends_with(item_suffix))
        .collect();
    if items.is_empty() {
        problems.push("package contains no item files".to_string());
    }
    for item in items {
        if !referenced.contains(item) {
            problems.push(format!("{} is not referenced by the manifest", item));
        }
    }
    for file in &referenced {
        if !package_files.contains(file) {
            problems.push(format!("manifest references missing file {}", file));
        }
    }
    let mut seen = BTreeSet::new();
    for identifier in &identifiers {
        if !seen.insert(identifier) {
            problems.push(format!("resource identifier {} is used more than once", identifier));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BuilderRegistry;
    use quizmark_parser::quizmark::testing::Samples;

    fn metadata() -> PackageMetadata {
        PackageMetadata {
            identifier: "BIO_REVIEW".into(),
            title: "Cell Biology Review".into(),
            language: "en".into(),
        }
    }

    fn items() -> Vec<GeneratedItem> {
        let registry = BuilderRegistry::with_defaults();
        Samples::all_questions()
            .iter()
            .take(2)
            .map(|q| registry.generate(q, "en").unwrap())
            .collect()
    }

    #[test]
    fn classifications_have_distinct_shapes() {
        let manifest = build(&metadata(), &items(), "-item.xml", &[], None);
        let first = manifest.find("resource").unwrap();
        let classes = first.find_all("imsmd:classification");
        assert_eq!(classes.len(), 2);

        let labels = classes[0];
        assert_eq!(labels.find("imsmd:value").unwrap().text_content(), "idea");
        let taxa = labels.find_all("imsmd:taxon");
        assert_eq!(taxa.len(), 3);
        assert_eq!(taxa[0].find("imsmd:id").unwrap().text_content(), "Remember");

        let custom = classes[1];
        assert_eq!(custom.find("imsmd:value").unwrap().text_content(), "discipline");
        let source = custom.find("imsmd:taxonPath").unwrap().elements().next().unwrap();
        assert_eq!(source.text_content(), "Topic");
        let taxa = custom.find_all("imsmd:taxon");
        assert_eq!(taxa.len(), 2);
        assert!(taxa.iter().all(|t| t.find("imsmd:id").is_none()));
        assert_eq!(
            first.find("imsqti:interactionType").unwrap().text_content(),
            "choiceInteraction"
        );
    }

    #[test]
    fn self_check_accepts_a_complete_package() {
        let items = items();
        let xml = xml::render(&build(&metadata(), &items, "-item.xml", &[], None)).unwrap();
        let files = vec!["BIO_Q001-item.xml".to_string(), "BIO_Q002-item.xml".to_string()];
        assert!(check(Some(&xml), &files, "-item.xml").is_empty());
        assert_eq!(referenced_files(&xml).unwrap(), files);
    }

    #[test]
    fn assessment_resource_stays_apart_from_items() {
        let items = items();
        let assessment = GeneratedAssessment {
            identifier: items[0].identifier.clone(),
            title: "Review".into(),
            xml: String::new(),
            sections: Vec::new(),
            items: items.iter().map(|i| i.identifier.clone()).collect(),
        };
        let xml =
            xml::render(&build(&metadata(), &items, "-item.xml", &[], Some(&assessment))).unwrap();

        let ids = resource_identifiers(&xml).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[2], format!("TEST_{}", items[0].identifier));
        let files = vec![
            "BIO_Q001-item.xml".to_string(),
            "BIO_Q002-item.xml".to_string(),
            assessment_href(&assessment.identifier),
        ];
        assert!(check(Some(&xml), &files, "-item.xml").is_empty());
    }

    #[test]
    fn self_check_reports_duplicate_resources() {
        let item = &items()[0];
        let duplicated = vec![item.clone(), item.clone()];
        let xml = xml::render(&build(&metadata(), &duplicated, "-item.xml", &[], None)).unwrap();
        let problems = check(Some(&xml), &["BIO_Q001-item.xml".to_string()], "-item.xml");
        assert_eq!(problems, vec!["resource identifier BIO_Q001 is used more than once"]);
    }

    #[test]
    fn self_check_reports_problems() {
        assert_eq!(check(None, &[], "-item.xml"), vec!["imsmanifest.xml is missing"]);

        let xml = xml::render(&build(&metadata(), &items()[..1], "-item.xml", &[], None)).unwrap();
        let files = vec!["BIO_Q001-item.xml".to_string(), "BIO_Q002-item.xml".to_string()];
        let problems = check(Some(&xml), &files, "-item.xml");
        assert_eq!(problems, vec!["BIO_Q002-item.xml is not referenced by the manifest"]);

        let problems = check(Some(&xml), &[], "-item.xml");
        assert!(problems.contains(&"package contains no item files".to_string()));
    }
}
