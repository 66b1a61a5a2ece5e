//! Encodes a value through an output tree into response parts.

use crate::body::RawBody;
use crate::error::StructuralError;
use crate::http::{header_values, Header};
use crate::node::{BasicOutput, OutputNode};
use crate::params::Params;
use crate::server::ServerResponse;

/// Applied to the final header list, in the order they were added.
pub type HeaderTransform = Box<dyn FnOnce(&mut Vec<Header>) + Send>;

/// The response parts an output tree produced.
#[derive(Default)]
pub struct OutputValues {
    body: Option<RawBody>,
    headers: Vec<Header>,
    transforms: Vec<HeaderTransform>,
    status: Option<u16>,
}

impl OutputValues {
    pub fn body(&self) -> Option<&RawBody> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    fn set_header_if_absent(&mut self, name: &'static str, value: String) {
        self.transforms.push(Box::new(move |headers: &mut Vec<Header>| {
            if header_values(headers, name).is_empty() {
                headers.push((name.to_string(), value));
            }
        }));
    }

    /// Applies pending header transforms; `default_status` is used when no
    /// output set a status code.
    pub fn into_response(self, default_status: u16) -> ServerResponse {
        let mut headers = self.headers;
        for transform in self.transforms {
            transform(&mut headers);
        }
        ServerResponse {
            status: self.status.unwrap_or(default_status),
            headers,
            body: self.body,
        }
    }
}

impl std::fmt::Debug for OutputValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputValues")
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("transforms", &self.transforms.len())
            .field("status", &self.status)
            .finish()
    }
}

pub fn encode_output(node: &OutputNode, value: Params) -> Result<OutputValues, StructuralError> {
    let mut values = OutputValues::default();
    encode_into(node, value, &mut values)?;
    Ok(values)
}

fn encode_into(node: &OutputNode, value: Params, acc: &mut OutputValues) -> Result<(), StructuralError> {
    match node {
        OutputNode::Basic(basic) => encode_basic(basic, value, acc),
        OutputNode::Pair(pair) => {
            let (left, right) = (pair.split)(value);
            encode_into(&pair.left, left, acc)?;
            encode_into(&pair.right, right, acc)
        }
        OutputNode::Mapped(mapped) => encode_into(&mapped.wrapped, (mapped.encode)(value), acc),
        OutputNode::OneOf(one_of) => {
            let variant = one_of
                .variants
                .iter()
                .find(|variant| (variant.applies)(&value))
                .ok_or(StructuralError::NoMatchingVariant)?;
            if let Some(status) = variant.status {
                acc.status = Some(status);
            }
            encode_into(&variant.output, value, acc)
        }
        OutputNode::Void => Err(StructuralError::VoidOutput),
    }
}

fn encode_basic(basic: &BasicOutput, value: Params, acc: &mut OutputValues) -> Result<(), StructuralError> {
    match basic {
        BasicOutput::Body(leaf) => {
            if acc.body.is_some() {
                return Err(StructuralError::DuplicateBody("output"));
            }
            let raw = leaf.codec.encode_params(value);
            acc.set_header_if_absent("content-type", leaf.codec.format().media_type().to_string());
            if let Some(len) = raw.len() {
                acc.set_header_if_absent("content-length", len.to_string());
            }
            acc.body = Some(raw);
        }
        BasicOutput::Header { name, codec } => {
            for v in codec.encode_params(value) {
                acc.headers.push((name.clone(), v));
            }
        }
        BasicOutput::FixedHeader { name, value } => acc.headers.push((name.clone(), value.clone())),
        BasicOutput::Headers { codec } => acc.headers.extend(codec.encode_params(value)),
        BasicOutput::StatusCode { codec } => acc.status = Some(codec.encode_params(value)),
        BasicOutput::FixedStatusCode(code) => acc.status = Some(*code),
        BasicOutput::Empty => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{self, Output};
    use crate::tuple::Tuple;

    fn encode<T: Tuple>(output: &Output<T>, value: T) -> Result<ServerResponse, StructuralError> {
        encode_output(output.node(), value.into_params()).map(|values| values.into_response(200))
    }

    #[test]
    fn body_adds_content_headers_unless_set() {
        let plain = output::body_text();
        let response = encode(&plain, ("hi".to_string(),)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type").as_deref(), Some("text/plain; charset=utf-8"));
        assert_eq!(response.header("content-length").as_deref(), Some("2"));

        let explicit = output::fixed_header("Content-Type", "text/markdown").and(output::body_text());
        let response = encode(&explicit, ("# hi".to_string(),)).unwrap();
        assert_eq!(header_values(&response.headers, "content-type"), vec!["text/markdown".to_string()]);
    }

    #[test]
    fn status_and_headers_are_collected() {
        let created = output::fixed_status(201)
            .and(output::header::<String>("location"))
            .and(output::header_opt::<u32>("x-total-count"));
        let response = encode(&created, ("/items/1".to_string(), None)).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.headers, vec![("location".to_string(), "/items/1".to_string())]);
        assert!(response.body.is_none());
    }

    #[derive(Debug, PartialEq)]
    enum Outcome {
        Missing,
        Conflict(String),
    }

    #[test]
    fn one_of_takes_the_first_matching_variant() {
        let outcome = output::one_of::<Outcome>()
            .variant(404, output::empty().map(|()| Outcome::Missing, |_| ()), |o| matches!(o, Outcome::Missing))
            .variant(
                409,
                output::body_text().map(
                    |(msg,)| Outcome::Conflict(msg),
                    |o| match o {
                        Outcome::Conflict(msg) => (msg,),
                        Outcome::Missing => (String::new(),),
                    },
                ),
                |_| true,
            )
            .build();
        assert_eq!(encode(&outcome, (Outcome::Missing,)).unwrap().status, 404);
        let conflict = encode(&outcome, (Outcome::Conflict("taken".to_string()),)).unwrap();
        assert_eq!(conflict.status, 409);
        assert_eq!(conflict.body.and_then(|b| b.len()), Some(5));
    }

    #[test]
    fn one_of_without_a_match_is_structural() {
        let outcome = output::one_of::<Outcome>()
            .variant(404, output::empty().map(|()| Outcome::Missing, |_| ()), |o| matches!(o, Outcome::Missing))
            .build();
        let err = encode(&outcome, (Outcome::Conflict("x".to_string()),)).unwrap_err();
        assert_eq!(err, StructuralError::NoMatchingVariant);
    }

    #[test]
    fn two_body_outputs_are_structural() {
        let both = output::body_text().and(output::body_text());
        let err = encode(&both, ("a".to_string(), "b".to_string())).unwrap_err();
        assert_eq!(err, StructuralError::DuplicateBody("output"));
    }

    #[test]
    fn void_cannot_be_encoded() {
        let err = encode_output(&OutputNode::Void, Params::unit()).unwrap_err();
        assert_eq!(err, StructuralError::VoidOutput);
    }
}
