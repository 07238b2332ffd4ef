//! Document properties: `docProps/core.xml` and `docProps/app.xml`

use chrono::{DateTime, NaiveDateTime};

use crate::model::DocProperties;
use crate::xml::XmlElement;

pub const CORE_PART: &str = "docProps/core.xml";
pub const APP_PART: &str = "docProps/app.xml";

const CORE_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const DCMITYPE_NS: &str = "http://purl.org/dc/dcmitype/";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const APP_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
const VT_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

const W3CDTF: &str = "%Y-%m-%dT%H:%M:%SZ";

fn text_element(name: &str, value: &str) -> XmlElement {
    XmlElement::new(name).with_text(value)
}

fn timestamp(name: &str, value: &NaiveDateTime) -> XmlElement {
    XmlElement::new(name)
        .with_attr("xsi:type", "dcterms:W3CDTF")
        .with_text(value.format(W3CDTF).to_string())
}

/// Build `core.xml`; missing timestamps are filled with `now`
pub fn core_xml(props: &DocProperties, now: NaiveDateTime) -> XmlElement {
    let mut root = XmlElement::new("cp:coreProperties")
        .with_attr("xmlns:cp", CORE_NS)
        .with_attr("xmlns:dc", DC_NS)
        .with_attr("xmlns:dcterms", DCTERMS_NS)
        .with_attr("xmlns:dcmitype", DCMITYPE_NS)
        .with_attr("xmlns:xsi", XSI_NS);
    let fields = [
        ("dc:title", &props.title),
        ("dc:subject", &props.subject),
        ("dc:creator", &props.creator),
        ("cp:keywords", &props.keywords),
        ("dc:description", &props.description),
        ("cp:lastModifiedBy", &props.last_modified_by),
        ("cp:category", &props.category),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            root.push(text_element(name, value));
        }
    }
    root.push(timestamp("dcterms:created", &props.created.unwrap_or(now)));
    root.push(timestamp("dcterms:modified", &props.modified.unwrap_or(now)));
    root
}

/// Build `app.xml` listing the sheet titles
pub fn app_xml(props: &DocProperties, application: &str, sheet_names: &[&str]) -> XmlElement {
    let heading_pairs = XmlElement::new("vt:vector")
        .with_attr("size", 2)
        .with_attr("baseType", "variant")
        .with_child(XmlElement::new("vt:variant").with_child(text_element("vt:lpstr", "Worksheets")))
        .with_child(
            XmlElement::new("vt:variant")
                .with_child(text_element("vt:i4", &sheet_names.len().to_string())),
        );
    let titles = XmlElement::new("vt:vector")
        .with_attr("size", sheet_names.len())
        .with_attr("baseType", "lpstr")
        .with_children(sheet_names.iter().map(|name| text_element("vt:lpstr", name)));

    let mut root = XmlElement::new("Properties")
        .with_attr("xmlns", APP_NS)
        .with_attr("xmlns:vt", VT_NS)
        .with_child(text_element("Application", application))
        .with_child(text_element("DocSecurity", "0"))
        .with_child(text_element("ScaleCrop", "false"))
        .with_child(XmlElement::new("HeadingPairs").with_child(heading_pairs))
        .with_child(XmlElement::new("TitlesOfParts").with_child(titles));
    if let Some(company) = &props.company {
        root.push(text_element("Company", company));
    }
    root.with_child(text_element("LinksUpToDate", "false"))
        .with_child(text_element("SharedDoc", "false"))
        .with_child(text_element("HyperlinksChanged", "false"))
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn non_empty(el: &XmlElement) -> Option<String> {
    let text = el.text();
    (!text.is_empty()).then_some(text)
}

/// Copy the fields of a parsed `core.xml` into `props`
pub fn read_core(root: &XmlElement, props: &mut DocProperties) {
    for el in root.elements() {
        let slot = match el.local_name() {
            "title" => &mut props.title,
            "subject" => &mut props.subject,
            "creator" => &mut props.creator,
            "keywords" => &mut props.keywords,
            "description" => &mut props.description,
            "lastModifiedBy" => &mut props.last_modified_by,
            "category" => &mut props.category,
            "created" | "modified" => {
                let parsed = parse_timestamp(&el.text());
                if parsed.is_none() {
                    log::warn!("{CORE_PART}: unreadable {} timestamp '{}'", el.local_name(), el.text());
                }
                if el.local_name() == "created" {
                    props.created = parsed;
                } else {
                    props.modified = parsed;
                }
                continue;
            }
            _ => continue,
        };
        *slot = non_empty(el);
    }
}

/// Copy the fields of a parsed `app.xml` into `props`
pub fn read_app(root: &XmlElement, props: &mut DocProperties) {
    if let Some(app) = root.child("Application") {
        props.application = non_empty(app);
    }
    if let Some(company) = root.child("Company") {
        props.company = non_empty(company);
    }
}
