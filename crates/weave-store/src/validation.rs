//! Store-contextual validation helpers.
//!
//! Storage accepts any well-formed link: a repeat root for a map, or a
//! child whose predecessor was never stored, are persisted without
//! complaint. Chain integrity is an ingress concern, and these helpers are
//! what ingress layers run before creating a *new* link.

use weave_types::{Link, LinkHash, ValidationError};

use crate::adapter::StoreReader;
use crate::error::StoreResult;
use crate::filter::{Pagination, SegmentFilter};

/// Validate a link against the store it is about to enter.
///
/// Beyond [`Link::validate`], this checks that a non-root link's
/// predecessor exists, and that a root link does not land in a map that
/// already has one. Both properties are advisory: the check races with
/// concurrent writers and storage will accept the link either way.
pub fn validate_new_link<R: StoreReader + ?Sized>(reader: &R, link: &Link) -> StoreResult<()> {
    link.validate()?;

    match link.prev_link_hash() {
        Some(prev) => {
            let prev_hash = LinkHash::from_hex(prev)?;
            if reader.get_segment(&prev_hash)?.is_none() {
                return Err(ValidationError::MissingPrevLink {
                    link_hash: prev.to_string(),
                }
                .into());
            }
        }
        None => {
            let roots = reader.find_segments(&SegmentFilter {
                map_ids: vec![link.map_id().to_string()],
                prev_link_hash: Some(String::new()),
                pagination: Pagination::new(0, 1),
                ..SegmentFilter::default()
            })?;
            if !roots.is_empty() {
                return Err(ValidationError::DuplicateRoot {
                    map_id: link.map_id().to_string(),
                }
                .into());
            }
        }
    }

    Ok(())
}
