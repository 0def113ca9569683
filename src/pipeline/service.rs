//! Line-delimited JSON protocol spoken with the external native converter
//! process, and the trait boundary the orchestrator calls through. The
//! converter's internal binary encoding is opaque; this side only produces
//! well-formed XML for it and tracks request/response pairs by id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Health,
    ConvertYdr,
    ConvertYtd,
    ConvertYbn,
    ConvertYtyp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl ServiceRequest {
    pub fn health(ids: &mut RequestIds) -> Self {
        Self {
            id: ids.next(),
            kind: RequestKind::Health,
            xml_path: None,
            input_folder: None,
            output_path: None,
        }
    }

    pub fn convert(
        ids: &mut RequestIds,
        kind: RequestKind,
        xml_path: &str,
        input_folder: Option<&str>,
        output_path: &str,
    ) -> Self {
        Self {
            id: ids.next(),
            kind,
            xml_path: Some(xml_path.to_owned()),
            input_folder: input_folder.map(str::to_owned),
            output_path: Some(output_path.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Source of request ids, injected by the caller so tests stay
/// deterministic.
pub struct RequestIds {
    next: Box<dyn FnMut() -> String + Send>,
}

impl RequestIds {
    /// Random ids for production use.
    pub fn random() -> Self {
        Self {
            next: Box::new(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Monotonic ids for tests and logs.
    pub fn sequential() -> Self {
        let mut counter = 0u64;
        Self {
            next: Box::new(move || {
                counter += 1;
                format!("req_{}", counter)
            }),
        }
    }

    pub fn next(&mut self) -> String {
        (self.next)()
    }
}

/// Boundary to the native binary conversion service. Implementations own
/// the process lifecycle and the bounded wait on each request; on timeout
/// or crash the request fails and is not retried.
pub trait BinaryConverter {
    fn is_available(&self) -> bool;

    fn convert(&mut self, request: &ServiceRequest) -> anyhow::Result<ServiceResponse>;
}

/// Stand-in when the native service is not installed; the pipeline then
/// degrades to XML-only output.
pub struct UnavailableConverter;

impl BinaryConverter for UnavailableConverter {
    fn is_available(&self) -> bool {
        false
    }

    fn convert(&mut self, _request: &ServiceRequest) -> anyhow::Result<ServiceResponse> {
        anyhow::bail!("the native conversion service is not running")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn request_wire_format() {
        let mut ids = RequestIds::sequential();
        let request = ServiceRequest::convert(
            &mut ids,
            RequestKind::ConvertYdr,
            "C:/tmp/prop.ydr.xml",
            Some("C:/tmp"),
            "C:/tmp/prop.ydr",
        );
        let line = serde_json::to_string(&request).unwrap();
        assert_eq!(
            "{\"id\":\"req_1\",\"type\":\"convert_ydr\",\
             \"xmlPath\":\"C:/tmp/prop.ydr.xml\",\"inputFolder\":\"C:/tmp\",\
             \"outputPath\":\"C:/tmp/prop.ydr\"}",
            line
        );
    }

    #[test]
    fn health_request_omits_paths() {
        let mut ids = RequestIds::sequential();
        let line = serde_json::to_string(&ServiceRequest::health(&mut ids)).unwrap();
        assert_eq!("{\"id\":\"req_1\",\"type\":\"health\"}", line);
    }

    #[test]
    fn response_parsing() {
        let response: ServiceResponse =
            serde_json::from_str("{\"id\":\"req_2\",\"success\":false,\"error\":\"boom\"}")
                .unwrap();
        assert_eq!("req_2", response.id);
        assert!(!response.success);
        assert_eq!(Some(String::from("boom")), response.error);
        assert_eq!(None, response.output_path);
    }

    #[test]
    fn sequential_ids_are_deterministic() {
        let mut ids = RequestIds::sequential();
        assert_eq!("req_1", ids.next());
        assert_eq!("req_2", ids.next());
    }
}
