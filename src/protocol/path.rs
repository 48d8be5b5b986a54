//! Path template compilation.
//!
//! # Responsibilities
//! - Parse protocol path templates (`/item/:id`, `/item/{id}`, `/item/:id?`)
//! - Check placeholders against declared params
//! - Render concrete axum route paths, one per combination of optional segments
//!
//! # Design Decisions
//! - A placeholder must fill a whole segment
//! - Optional segments become extra route variants (axum has no optional captures)
//! - Trailing slashes are dropped; the root template renders as `/`

use std::collections::BTreeMap;

use thiserror::Error;

use crate::protocol::schema::ParamSpec;

/// Upper bound on optional segments per template (variants grow as 2^n).
const MAX_OPTIONAL_SEGMENTS: usize = 6;

/// Errors found while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path template must start with '/': {0}")]
    NotAbsolute(String),

    #[error("empty placeholder in path template {0}")]
    EmptyPlaceholder(String),

    #[error("placeholder must fill a whole path segment: {0}")]
    PartialSegment(String),

    #[error("placeholder '{0}' appears more than once")]
    DuplicatePlaceholder(String),

    #[error("placeholder '{0}' is not a declared param")]
    UndeclaredPlaceholder(String),

    #[error("too many optional segments ({0}, max {max})", max = MAX_OPTIONAL_SEGMENTS)]
    TooManyOptional(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture { name: String, optional: bool },
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template. Only checks structure; see [`PathTemplate::check_params`].
    pub fn parse(template: &str) -> Result<Self, PathError> {
        if !template.starts_with('/') {
            return Err(PathError::NotAbsolute(template.to_string()));
        }

        let mut segments = Vec::new();
        for raw in template.split('/').filter(|s| !s.is_empty()) {
            let capture = if let Some(rest) = raw.strip_prefix(':') {
                Some(rest)
            } else if raw.starts_with('{') && raw.ends_with('}') && raw.len() >= 2 {
                Some(&raw[1..raw.len() - 1])
            } else {
                None
            };

            let segment = match capture {
                Some(inner) => {
                    let (name, optional) = match inner.strip_suffix('?') {
                        Some(name) => (name, true),
                        None => (inner, false),
                    };
                    if name.is_empty() {
                        return Err(PathError::EmptyPlaceholder(template.to_string()));
                    }
                    if name.contains(['{', '}', ':']) {
                        return Err(PathError::PartialSegment(raw.to_string()));
                    }
                    Segment::Capture {
                        name: name.to_string(),
                        optional,
                    }
                }
                None if raw.contains(['{', '}']) || raw.starts_with('*') => {
                    return Err(PathError::PartialSegment(raw.to_string()));
                }
                None => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Capture { name, .. } = segment {
                if seen.contains(&name.as_str()) {
                    return Err(PathError::DuplicatePlaceholder(name.clone()));
                }
                seen.push(name);
            }
        }

        Ok(Self { segments })
    }

    /// Placeholder names in template order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Capture { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Every placeholder must name a declared param.
    pub fn check_params(&self, params: &BTreeMap<String, ParamSpec>) -> Result<(), PathError> {
        match self.placeholders().find(|name| !params.contains_key(*name)) {
            Some(name) => Err(PathError::UndeclaredPlaceholder(name.to_string())),
            None => Ok(()),
        }
    }

    /// Render axum route paths.
    ///
    /// A placeholder is optional when marked with `?` or when its param is
    /// `required: false`. The first variant always contains every segment.
    pub fn routes(&self, params: &BTreeMap<String, ParamSpec>) -> Result<Vec<String>, PathError> {
        let optional: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| match segment {
                Segment::Capture { name, optional } => {
                    let declared_optional = params.get(name).map(|p| !p.required).unwrap_or(false);
                    (*optional || declared_optional).then_some(index)
                }
                Segment::Literal(_) => None,
            })
            .collect();

        if optional.len() > MAX_OPTIONAL_SEGMENTS {
            return Err(PathError::TooManyOptional(optional.len()));
        }

        let mut routes: Vec<String> = Vec::new();
        for mask in 0u32..(1 << optional.len()) {
            let omitted = |index: usize| {
                optional
                    .iter()
                    .position(|&o| o == index)
                    .map(|bit| mask & (1 << bit) != 0)
                    .unwrap_or(false)
            };
            let mut path = String::new();
            for (index, segment) in self.segments.iter().enumerate() {
                if omitted(index) {
                    continue;
                }
                path.push('/');
                match segment {
                    Segment::Literal(text) => path.push_str(text),
                    Segment::Capture { name, .. } => {
                        path.push('{');
                        path.push_str(name);
                        path.push('}');
                    }
                }
            }
            if path.is_empty() {
                path.push('/');
            }
            if !routes.contains(&path) {
                routes.push(path);
            }
        }

        Ok(routes)
    }
}

/// Route path with every capture name erased, used to detect matcher conflicts
/// between routes that differ only in capture names.
pub fn route_shape(route: &str) -> String {
    route
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
