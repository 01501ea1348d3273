//! Scraping of the XML/HTML pages returned by the RapidDeploy web services.
//!
//! The server has no schema: values are found by collecting the text of every
//! element with a given tag and pairing a known label with the value that
//! follows it.

use quick_xml::events::Event;
use quick_xml::Reader;
use rapiddeploy_api::{
    DeployError,
    DeployResult,
    JobId,
    JobPlan,
};

pub const JOB_ID_LABEL: &str = "Deployment Job ID";
pub const JOB_STATUS_LABEL: &str = "Display Details Job Status";
pub const CHILD_JOB_ID_LABEL: &str = "Included Job ID";

/// HTML elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn is_void(name: &[u8]) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.as_bytes().eq_ignore_ascii_case(name))
}

#[derive(Default)]
struct Slot {
    values: Vec<String>,
    run: String,
}

impl Slot {
    fn flush(&mut self) {
        let text = self.run.trim();
        if !text.is_empty() {
            self.values.push(text.to_string());
        }
        self.run.clear();
    }
}

struct Open {
    name: Vec<u8>,
    slot: Option<usize>,
}

/// Text of the direct child text nodes of every `tag` element, flattened in
/// document order of the elements (outer before nested).
pub fn extract_tag_values(body: &str, tag: &str) -> DeployResult<Vec<String>> {
    let mut reader = Reader::from_str(body);
    // Pages are HTML-ish: end names are not matched against open tags.
    reader.config_mut().check_end_names = false;

    let tag = tag.as_bytes();
    let mut slots: Vec<Slot> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if is_void(e.name().as_ref()) => {
                // `<br>` and friends are never closed, so they do not open a scope
                if let Some(i) = stack.last().and_then(|o| o.slot) {
                    slots[i].flush();
                }
                if e.name().as_ref() == tag {
                    slots.push(Slot::default());
                }
            }
            Ok(Event::Start(e)) => {
                if let Some(i) = stack.last().and_then(|o| o.slot) {
                    slots[i].flush();
                }
                let name = e.name().as_ref().to_vec();
                let slot = (name == tag).then(|| {
                    slots.push(Slot::default());
                    slots.len() - 1
                });
                stack.push(Open { name, slot });
            }
            Ok(Event::Empty(e)) => {
                if let Some(i) = stack.last().and_then(|o| o.slot) {
                    slots[i].flush();
                }
                if e.name().as_ref() == tag {
                    slots.push(Slot::default());
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if let Some(pos) = stack.iter().rposition(|o| o.name == name.as_ref()) {
                    for open in stack.drain(pos..) {
                        if let Some(i) = open.slot {
                            slots[i].flush();
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(i) = stack.last().and_then(|o| o.slot) {
                    match e.unescape() {
                        Ok(text) => slots[i].run.push_str(&text),
                        // HTML entities such as &nbsp; are not known to XML
                        Err(_) => slots[i].run.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(i) = stack.last().and_then(|o| o.slot) {
                    slots[i].run.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DeployError::Parse(format!(
                    "Malformed response at position {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    for open in stack {
        if let Some(i) = open.slot {
            slots[i].flush();
        }
    }

    Ok(slots.into_iter().flat_map(|s| s.values).collect())
}

/// The value right after the last occurrence of `label`.
///
/// Last match wins: when a page repeats the label, earlier values are
/// overwritten by later ones. A label with nothing after it yields no value.
pub fn value_after_label(values: &[String], label: &str) -> Option<String> {
    values
        .windows(2)
        .filter(|pair| pair[0] == label)
        .map(|pair| pair[1].clone())
        .last()
}

/// Every value that follows `label`, in document order
pub fn values_after_label(values: &[String], label: &str) -> Vec<String> {
    values
        .windows(2)
        .filter(|pair| pair[0] == label)
        .map(|pair| pair[1].clone())
        .collect()
}

fn span_value(body: &str, label: &str) -> Option<String> {
    match extract_tag_values(body, "span") {
        Ok(values) => value_after_label(&values, label),
        Err(e) => {
            tracing::warn!(label, error = %e, "could not scrape response, treating value as absent");
            None
        }
    }
}

pub fn extract_job_id(body: &str) -> Option<JobId> {
    span_value(body, JOB_ID_LABEL).map(JobId::new)
}

/// Raw status string from a job details page
pub fn extract_job_status(body: &str) -> Option<String> {
    span_value(body, JOB_STATUS_LABEL)
}

/// Jobs run as part of a job plan, listed on the plan's job details page
pub fn extract_child_job_ids(body: &str) -> Vec<JobId> {
    match extract_tag_values(body, "span") {
        Ok(values) => values_after_label(&values, CHILD_JOB_ID_LABEL)
            .into_iter()
            .map(JobId::new)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not scrape child jobs from job details");
            Vec::new()
        }
    }
}

/// Project, environment or package names; the server renders missing names as `null`
pub fn extract_names(body: &str, tag: &str) -> DeployResult<Vec<String>> {
    Ok(extract_tag_values(body, tag)?
        .into_iter()
        .filter(|name| name != "null")
        .collect())
}

/// Job plans, pairing `id` and `name` elements by position
pub fn extract_job_plans(body: &str) -> DeployResult<Vec<JobPlan>> {
    let ids = extract_tag_values(body, "id")?;
    let names = extract_tag_values(body, "name")?;
    if ids.len() != names.len() {
        tracing::warn!(
            ids = ids.len(),
            names = names.len(),
            "job plan list has unpaired entries, extra entries ignored"
        );
    }

    Ok(ids
        .into_iter()
        .zip(names)
        .map(|(id, description)| JobPlan { id, description })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMIT_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html>
  <body>
    <div>
      <span>Deployment Job ID</span><span>123</span>
      <span>Display Details Job Status</span><span>SUBMITTED</span>
    </div>
  </body>
</html>"#;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_flat_values_in_document_order() {
        let values = extract_tag_values(SUBMIT_RESPONSE, "span").unwrap();
        assert_eq!(
            values,
            strings(&[
                "Deployment Job ID",
                "123",
                "Display Details Job Status",
                "SUBMITTED"
            ])
        );
    }

    #[test]
    fn test_nested_matches_outer_first() {
        let body = "<r><span>outer<span>inner</span>tail</span><span>next</span></r>";
        let values = extract_tag_values(body, "span").unwrap();
        assert_eq!(values, strings(&["outer", "tail", "inner", "next"]));
    }

    #[test]
    fn test_only_direct_text_children() {
        let body = "<r><name><b>bold</b></name><name>plain &amp; simple</name></r>";
        let values = extract_tag_values(body, "name").unwrap();
        assert_eq!(values, strings(&["plain & simple"]));
    }

    #[test]
    fn test_html_leniency() {
        let body = "<html><body><span>a&nbsp;b</span><br><span>c</span></body></html>";
        let values = extract_tag_values(body, "span").unwrap();
        assert_eq!(values, strings(&["a&nbsp;b", "c"]));
    }

    #[test]
    fn test_text_after_void_element_is_kept() {
        let body = "<html><span>Display Details Job Status</span>\
                    <span><img src='ok.png'>COMPLETED</span></html>";
        assert_eq!(extract_job_status(body).as_deref(), Some("COMPLETED"));

        let body = "<r><span>Deployment Job ID</span><span>42<br>extra</span><span>next</span></r>";
        assert_eq!(
            extract_tag_values(body, "span").unwrap(),
            strings(&["Deployment Job ID", "42", "extra", "next"])
        );

        let body = "<r><span>a<BR>b</span></r>";
        assert_eq!(
            extract_tag_values(body, "span").unwrap(),
            strings(&["a", "b"])
        );
    }

    #[test]
    fn test_cdata_text() {
        let body = "<r><span><![CDATA[x < y]]></span></r>";
        assert_eq!(
            extract_tag_values(body, "span").unwrap(),
            strings(&["x < y"])
        );
    }

    #[test]
    fn test_job_id_and_status() {
        assert_eq!(extract_job_id(SUBMIT_RESPONSE), Some(JobId::new("123")));
        assert_eq!(
            extract_job_status(SUBMIT_RESPONSE).as_deref(),
            Some("SUBMITTED")
        );
    }

    #[test]
    fn test_last_label_wins() {
        let body = "<r><span>Deployment Job ID</span><span>1</span>\
                    <span>Deployment Job ID</span><span>2</span></r>";
        assert_eq!(extract_job_id(body), Some(JobId::new("2")));

        let values = strings(&["Display Details Job Status", "EXECUTING", "x", "Display Details Job Status", "COMPLETED"]);
        assert_eq!(
            value_after_label(&values, JOB_STATUS_LABEL).as_deref(),
            Some("COMPLETED")
        );
    }

    #[test]
    fn test_trailing_label_has_no_value() {
        let values = strings(&["Deployment Job ID"]);
        assert_eq!(value_after_label(&values, JOB_ID_LABEL), None);

        let values = strings(&["Deployment Job ID", "5", "Deployment Job ID"]);
        assert_eq!(value_after_label(&values, JOB_ID_LABEL).as_deref(), Some("5"));
    }

    #[test]
    fn test_missing_label_is_none() {
        assert_eq!(extract_job_id("<r><span>nothing here</span></r>"), None);
        assert_eq!(extract_job_status(""), None);
    }

    #[test]
    fn test_child_job_ids_keep_order() {
        let body = "<r><span>Included Job ID</span><span>11</span>\
                    <span>Included Job ID</span><span>12</span>\
                    <span>Display Details Job Status</span><span>COMPLETED</span></r>";
        assert_eq!(
            extract_child_job_ids(body),
            vec![JobId::new("11"), JobId::new("12")]
        );
    }

    #[test]
    fn test_names_skip_null() {
        let body = "<projects><project><name>shop</name></project>\
                    <project><name>null</name></project>\
                    <project><name>billing</name></project></projects>";
        assert_eq!(
            extract_names(body, "name").unwrap(),
            strings(&["shop", "billing"])
        );
    }

    #[test]
    fn test_job_plans_pair_by_position() {
        let body = "<jobPlans>\
                    <jobPlan><id>3</id><name>Nightly</name></jobPlan>\
                    <jobPlan><id>1</id><name>Release</name></jobPlan>\
                    </jobPlans>";
        let plans = extract_job_plans(body).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].label(), "[3] Nightly");
        assert_eq!(plans[1].id, "1");
    }
}
