//! Path resolution against the frozen naming tree.
//!
//! Resolution walks from the root, matching one segment per level by exact
//! kind and value. There is no partial matching, backtracking or wildcard.

use tracing::debug;

use crate::tlv::{self, NameSegment, TlvError};
use crate::tree::{NodeId, TagTree};

/// A successfully resolved node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'t> {
    pub id: NodeId,
    pub name: &'t NameSegment,
    pub help: &'t NameSegment,
    pub qualifier: &'t str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// `segment` had no matching child at `depth` (0-based index into the path)
    #[error("no such name '{segment}' at depth {depth}")]
    NoSuchName { depth: usize, segment: NameSegment },
}

/// Errors from resolving a path still in wire form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireResolveError {
    #[error(transparent)]
    Malformed(#[from] TlvError),
    #[error(transparent)]
    NoSuchName(#[from] ResolveError),
}

/// Resolve decoded segments, starting at the root.
///
/// An empty path resolves to the root.
pub fn resolve<'t>(
    tree: &'t TagTree,
    segments: &[NameSegment],
) -> Result<Resolved<'t>, ResolveError> {
    let mut cursor = tree.root();
    for (depth, segment) in segments.iter().enumerate() {
        cursor = match tree.children(cursor.id()).find(|c| c.name() == segment) {
            Some(child) => child,
            None => {
                debug!(depth, segment = %segment, "no such name");
                return Err(ResolveError::NoSuchName {
                    depth,
                    segment: segment.clone(),
                });
            }
        };
    }

    debug!(id = %cursor.id(), qualifier = cursor.qualifier(), "path resolved");
    Ok(Resolved {
        id: cursor.id(),
        name: cursor.name(),
        help: cursor.help(),
        qualifier: cursor.qualifier(),
    })
}

/// Decode a concatenated TLV path and resolve it.
///
/// A malformed buffer is reported before any lookup happens.
pub fn resolve_wire<'t>(
    tree: &'t TagTree,
    bytes: &[u8],
) -> Result<Resolved<'t>, WireResolveError> {
    let segments = tlv::decode_path(bytes)?;
    Ok(resolve(tree, &segments)?)
}

/// Parse an operator-facing path such as `tag/sd/0/dblk/.recnum`.
///
/// Components that parse as a decimal `u8` become integers; a leading `'`
/// forces a string, so a lone `'` is the empty string. Empty components are
/// skipped, so leading and repeated slashes are harmless.
pub fn parse_text_path(path: &str) -> Vec<NameSegment> {
    path.split('/')
        .filter(|c| !c.is_empty())
        .map(|c| match c.strip_prefix('\'') {
            Some(quoted) => NameSegment::string(quoted),
            None => c
                .parse::<u8>()
                .map(NameSegment::Integer)
                .unwrap_or_else(|_| NameSegment::string(c)),
        })
        .collect()
}

/// Errors from rendering segments as an operator path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextPathError {
    /// The segment contains `/` or is not UTF-8, so no text form reads back
    /// as the same segment
    #[error("segment {index} ({segment:?}) has no text path form")]
    Unrepresentable { index: usize, segment: NameSegment },
}

/// Render segments back into operator form.
///
/// `parse_text_path` of the result gives back `segments` exactly. Strings
/// that are empty, start with `'`, or read as a `u8` are written with a
/// leading `'`.
pub fn format_text_path(segments: &[NameSegment]) -> Result<String, TextPathError> {
    let mut parts = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let part = match segment {
            NameSegment::Integer(v) => v.to_string(),
            NameSegment::String(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .ok()
                    .filter(|t| !t.contains('/'))
                    .ok_or_else(|| TextPathError::Unrepresentable {
                        index,
                        segment: segment.clone(),
                    })?;
                if needs_quote(text) {
                    format!("'{}", text)
                } else {
                    text.to_string()
                }
            }
        };
        parts.push(part);
    }
    Ok(parts.join("/"))
}

fn needs_quote(text: &str) -> bool {
    text.is_empty() || text.starts_with('\'') || text.parse::<u8>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TnId;
    use crate::tlv::encode_path;

    fn tree() -> TagTree {
        TagTree::builtin().unwrap()
    }

    #[test]
    fn test_resolve_recnum() {
        let tree = tree();
        let path = vec![
            NameSegment::string("tag"),
            NameSegment::string("sd"),
            NameSegment::Integer(0),
            NameSegment::string("dblk"),
            NameSegment::string(".recnum"),
        ];
        let resolved = resolve(&tree, &path).unwrap();
        assert_eq!(resolved.id, NodeId(15));
        assert_eq!(resolved.qualifier, "TN_15_UQ");
        assert_eq!(*resolved.help, NameSegment::string("help"));
        assert_eq!(*resolved.name, NameSegment::string(".recnum"));
    }

    #[test]
    fn test_empty_path_is_root() {
        let tree = tree();
        let resolved = resolve(&tree, &[]).unwrap();
        assert_eq!(resolved.id, NodeId::ROOT);
        assert_eq!(resolved.qualifier, "TN_0_UQ");
    }

    #[test]
    fn test_no_such_name() {
        let tree = tree();
        let err = resolve(&tree, &["tag".into(), "nonexistent".into()]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoSuchName {
                depth: 1,
                segment: NameSegment::string("nonexistent")
            }
        );
    }

    #[test]
    fn test_root_name_is_not_a_segment() {
        let tree = tree();
        assert!(resolve(&tree, &["root".into()]).is_err());
    }

    #[test]
    fn test_kind_must_match() {
        let tree = tree();
        // "0" as a string is not the integer 0 under sd
        let err = resolve(&tree, &["tag".into(), "sd".into(), "0".into()]).unwrap_err();
        assert!(matches!(err, ResolveError::NoSuchName { depth: 2, .. }));
    }

    #[test]
    fn test_case_sensitive() {
        let tree = tree();
        assert!(resolve(&tree, &["Tag".into()]).is_err());
    }

    #[test]
    fn test_no_partial_match() {
        let tree = tree();
        assert!(resolve(&tree, &["tag".into(), "sy".into()]).is_err());
        assert!(resolve(&tree, &["tag".into(), "sysx".into()]).is_err());
    }

    #[test]
    fn test_path_past_leaf() {
        let tree = tree();
        let err = resolve(&tree, &parse_text_path("tag/sys/rtc/extra")).unwrap_err();
        assert!(matches!(err, ResolveError::NoSuchName { depth: 3, .. }));
    }

    #[test]
    fn test_every_node_resolves_by_its_path() {
        let tree = tree();
        for id in TnId::ALL {
            let path = tree.path_of(id).unwrap();
            assert_eq!(resolve(&tree, &path).unwrap().id, NodeId::from(id));
        }
    }

    #[test]
    fn test_resolve_wire() {
        let tree = tree();
        let bytes = encode_path(&parse_text_path("tag/sd/0/panic/byte")).unwrap();
        assert_eq!(
            resolve_wire(&tree, &bytes).unwrap().id,
            NodeId::from(TnId::PanicByte)
        );
    }

    #[test]
    fn test_resolve_wire_malformed_first() {
        let tree = tree();
        // unknown segment followed by garbage: malformed wins
        let mut bytes = encode_path(&["nope".into()]).unwrap();
        bytes.extend_from_slice(&[9, 0]);
        assert!(matches!(
            resolve_wire(&tree, &bytes).unwrap_err(),
            WireResolveError::Malformed(_)
        ));
    }

    #[test]
    fn test_parse_text_path() {
        assert_eq!(
            parse_text_path("/tag//sd/0/'7/.test"),
            vec![
                NameSegment::string("tag"),
                NameSegment::string("sd"),
                NameSegment::Integer(0),
                NameSegment::string("7"),
                NameSegment::string(".test"),
            ]
        );
        assert!(parse_text_path("").is_empty());
        assert_eq!(parse_text_path("256"), vec![NameSegment::string("256")]);
    }

    #[test]
    fn test_format_text_path_round_trip() {
        let text = "tag/sd/0/'7/dblk";
        assert_eq!(format_text_path(&parse_text_path(text)).unwrap(), text);
    }

    #[test]
    fn test_format_text_path_quotes_awkward_strings() {
        let segments = vec![
            NameSegment::string("'a"),
            NameSegment::string(""),
            NameSegment::string("255"),
            NameSegment::Integer(255),
            NameSegment::string("'"),
            NameSegment::string(".recnum"),
        ];
        let text = format_text_path(&segments).unwrap();
        assert_eq!(text, "''a/'/'255/255/''/.recnum");
        assert_eq!(parse_text_path(&text), segments);
    }

    #[test]
    fn test_format_text_path_rejects_unrepresentable() {
        let slash = vec![NameSegment::string("tag"), NameSegment::string("a/b")];
        assert_eq!(
            format_text_path(&slash).unwrap_err(),
            TextPathError::Unrepresentable {
                index: 1,
                segment: NameSegment::string("a/b")
            }
        );

        let binary = vec![NameSegment::String(vec![0xff, 0xfe])];
        assert!(matches!(
            format_text_path(&binary),
            Err(TextPathError::Unrepresentable { index: 0, .. })
        ));
    }

    #[test]
    fn test_every_builtin_path_formats_and_reparses() {
        let tree = tree();
        for id in TnId::ALL {
            let path = tree.path_of(id).unwrap();
            let text = format_text_path(&path).unwrap();
            assert_eq!(parse_text_path(&text), path);
        }
    }
}
