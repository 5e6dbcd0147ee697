//! Sweep-line range flattening.
//!
//! Turns an arbitrary collection of overlapping tagged intervals into a
//! sorted partition of disjoint intervals, each carrying the set of tags
//! covering it grouped by type.
//!
//! Every input interval `[a, b]` contributes a start event at `a` and an
//! end event at `b`. Events are sorted by `(coordinate, start-before-end)`;
//! the tie-break matters: a source opening exactly where another closes
//! covers that coordinate, so at the shared coordinate both must be active.
//! Walking the sorted events with an active-tag count map, each adjacent
//! event pair delimits one output segment:
//!
//! - segment start `n` is `cur.n` for a start event, `cur.n + 1` for an end
//!   event (the source just closed, the next covered integer follows it);
//! - segment end `m` is `nex.n - 1` when the successor is a start (it opens
//!   a new segment at `nex.n`), `nex.n` when it is an end (it closes
//!   inclusively).
//!
//! A segment is emitted when `n <= m` and at least one tag is active.
//! Active tags are deduplicated by canonical JSON identity, so the same
//! tag covering a coordinate through several of its own ranges appears
//! once, while distinct tags over the same range all survive.

use std::collections::HashMap;

use cordon_core::{IntervalRecord, Payload, SourceRange, Tag};

/// One endpoint of a source interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Event {
    n: u32,
    /// false = interval opens here, true = interval closes here
    is_end: bool,
    /// Index into the interned tag table
    tag: u32,
}

/// Flatten tagged source ranges into disjoint, payload-carrying records.
///
/// Output records are in ascending `(start, end)` order. Memory is
/// proportional to two events per input range plus the interned tag table.
#[must_use]
pub fn flatten(ranges: Vec<SourceRange>) -> Vec<IntervalRecord> {
    // Intern tags by canonical JSON so the sweep works on small ids and
    // identical tags from different ranges collapse to one identity.
    let mut tag_ids: HashMap<String, u32> = HashMap::new();
    let mut tags: Vec<Tag> = Vec::new();
    let mut events: Vec<Event> = Vec::with_capacity(ranges.len() * 2);

    for range in ranges {
        let canonical = range.tag.canonical();
        let id = *tag_ids.entry(canonical).or_insert_with(|| {
            tags.push(range.tag.clone());
            (tags.len() - 1) as u32
        });
        events.push(Event {
            n: range.start,
            is_end: false,
            tag: id,
        });
        events.push(Event {
            n: range.end,
            is_end: true,
            tag: id,
        });
    }

    // Starts sort before ends at the same coordinate (false < true).
    events.sort_unstable_by_key(|e| (e.n, e.is_end));

    let mut active: HashMap<u32, u32> = HashMap::new();
    let mut records = Vec::new();

    for k in 0..events.len() {
        let cur = events[k];
        if cur.is_end {
            if let Some(count) = active.get_mut(&cur.tag) {
                *count -= 1;
                if *count == 0 {
                    active.remove(&cur.tag);
                }
            }
        } else {
            *active.entry(cur.tag).or_insert(0) += 1;
        }

        let Some(&nex) = events.get(k + 1) else {
            break;
        };

        // Signed arithmetic so the +-1 adjustments cannot wrap at the edges
        // of the address space.
        let n = i64::from(cur.n) + i64::from(cur.is_end);
        let m = i64::from(nex.n) - i64::from(!nex.is_end);

        if n <= m && !active.is_empty() {
            let mut ids: Vec<u32> = active.keys().copied().collect();
            ids.sort_unstable();
            let payload = Payload::from_tags(ids.iter().map(|&id| &tags[id as usize]));
            records.push(IntervalRecord {
                start: n as u32,
                end: m as u32,
                payload,
            });
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag::new("list", "test").with("name", name)
    }

    fn range(start: u32, end: u32, name: &str) -> SourceRange {
        SourceRange::new(start, end, tag(name))
    }

    fn names(record: &IntervalRecord) -> Vec<String> {
        record
            .payload
            .get("list")
            .unwrap()
            .iter()
            .map(|t| t.get("name").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(flatten(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_range() {
        let records = flatten(vec![range(10, 20, "a")]);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].start, records[0].end), (10, 20));
        assert_eq!(names(&records[0]), ["a"]);
    }

    #[test]
    fn test_single_host_interval() {
        let records = flatten(vec![range(7, 7, "a")]);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].start, records[0].end), (7, 7));
    }

    #[test]
    fn test_adjacent_ranges_no_gap() {
        // [a, b] and [b+1, c]: two records, independent payloads.
        let records = flatten(vec![range(1, 10, "a"), range(11, 20, "b")]);
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].start, records[0].end), (1, 10));
        assert_eq!(names(&records[0]), ["a"]);
        assert_eq!((records[1].start, records[1].end), (11, 20));
        assert_eq!(names(&records[1]), ["b"]);
    }

    #[test]
    fn test_overlapping_ranges() {
        // [1,10] and [5,15] -> [1,4:{a}], [5,10:{a,b}], [11,15:{b}].
        let records = flatten(vec![range(1, 10, "a"), range(5, 15, "b")]);
        assert_eq!(records.len(), 3);
        assert_eq!((records[0].start, records[0].end), (1, 4));
        assert_eq!(names(&records[0]), ["a"]);
        assert_eq!((records[1].start, records[1].end), (5, 10));
        assert_eq!(names(&records[1]), ["a", "b"]);
        assert_eq!((records[2].start, records[2].end), (11, 15));
        assert_eq!(names(&records[2]), ["b"]);
    }

    #[test]
    fn test_coincident_endpoints_tie_break() {
        // [1,5] and [5,10]: the shared coordinate belongs to both.
        let records = flatten(vec![range(1, 5, "a"), range(5, 10, "b")]);
        assert_eq!(records.len(), 3);
        assert_eq!((records[0].start, records[0].end), (1, 4));
        assert_eq!(names(&records[0]), ["a"]);
        assert_eq!((records[1].start, records[1].end), (5, 5));
        assert_eq!(names(&records[1]), ["a", "b"]);
        assert_eq!((records[2].start, records[2].end), (6, 10));
        assert_eq!(names(&records[2]), ["b"]);
    }

    #[test]
    fn test_identical_range_same_tag_deduplicates() {
        let records = flatten(vec![range(1, 10, "a"), range(1, 10, "a")]);
        assert_eq!(records.len(), 1);
        assert_eq!(names(&records[0]), ["a"]);
    }

    #[test]
    fn test_identical_range_distinct_sources_both_kept() {
        let t1 = Tag::new("list", "feed_one");
        let t2 = Tag::new("list", "feed_two");
        let records = flatten(vec![
            SourceRange::new(1, 10, t1),
            SourceRange::new(1, 10, t2),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload.get("list").unwrap().len(), 2);
    }

    #[test]
    fn test_nested_ranges() {
        // [1,20] containing [5,10].
        let records = flatten(vec![range(1, 20, "outer"), range(5, 10, "inner")]);
        assert_eq!(records.len(), 3);
        assert_eq!((records[0].start, records[0].end), (1, 4));
        assert_eq!((records[1].start, records[1].end), (5, 10));
        assert_eq!(names(&records[1]), ["outer", "inner"]);
        assert_eq!((records[2].start, records[2].end), (11, 20));
    }

    #[test]
    fn test_payload_groups_by_tag_type() {
        let records = flatten(vec![
            SourceRange::new(1, 10, Tag::new("list", "spamhaus_drop")),
            SourceRange::new(1, 10, Tag::new("cloud", "aws").with("region", "us-east-1")),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload.get("list").unwrap().len(), 1);
        assert_eq!(records[0].payload.get("cloud").unwrap().len(), 1);
    }

    #[test]
    fn test_zero_edge() {
        let records = flatten(vec![range(0, 5, "a")]);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].start, records[0].end), (0, 5));
    }

    #[test]
    fn test_address_space_top_edge() {
        // A range closing at 2^32-1 must not wrap computing n+1.
        let records = flatten(vec![range(u32::MAX - 5, u32::MAX, "a")]);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].start, records[0].end), (u32::MAX - 5, u32::MAX));
    }

    #[test]
    fn test_overlap_at_top_edge() {
        let records = flatten(vec![
            range(u32::MAX - 10, u32::MAX, "a"),
            range(u32::MAX - 5, u32::MAX, "b"),
        ]);
        assert_eq!(records.len(), 2);
        assert_eq!(
            (records[0].start, records[0].end),
            (u32::MAX - 10, u32::MAX - 6)
        );
        assert_eq!(
            (records[1].start, records[1].end),
            (u32::MAX - 5, u32::MAX)
        );
        assert_eq!(names(&records[1]), ["a", "b"]);
    }

    #[test]
    fn test_whole_space_single_host_at_zero() {
        let records = flatten(vec![range(0, 0, "a")]);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].start, records[0].end), (0, 0));
    }

    #[test]
    fn test_disjointness_and_union_property() {
        // A haphazard pile of ranges; the output must partition their union,
        // and every coordinate must map to exactly the tags covering it.
        let inputs = [
            (5u32, 100u32, "a"),
            (50, 60, "b"),
            (60, 200, "c"),
            (150, 150, "d"),
            (300, 400, "e"),
            (5, 100, "a"),
        ];
        let records = flatten(
            inputs
                .iter()
                .map(|&(s, e, name)| range(s, e, name))
                .collect(),
        );

        // Disjoint and sorted.
        for pair in records.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }

        for x in 0..=450u32 {
            let mut expected: Vec<&str> = inputs
                .iter()
                .filter(|&&(s, e, _)| s <= x && x <= e)
                .map(|&(_, _, name)| name)
                .collect();
            expected.sort_unstable();
            expected.dedup();

            let actual: Vec<String> = records
                .iter()
                .find(|rec| rec.contains(x))
                .map(|rec| {
                    let mut tags = names(rec);
                    tags.sort();
                    tags
                })
                .unwrap_or_default();

            assert_eq!(actual, expected, "coordinate {x}");
        }
    }
}
