use std::collections::{BTreeMap, HashMap};
use roaring::RoaringTreemap;
use serde::{Serialize, Deserialize};
use crate::analysis::tokenizer::Token;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, FieldId, RowId};
use crate::index::posting::{Posting, PostingList};
use crate::index::term_dict::TermDictionary;

/// Postings of one column while documents are being buffered
#[derive(Debug, Default)]
pub struct FieldIndex {
    pub postings: BTreeMap<String, PostingList>,
    pub doc_lengths: Vec<u32>,  // Token count per doc_id
    pub total_tokens: u64,
}

/// In-memory inverted index for the segment under construction
#[derive(Debug)]
pub struct InvertedIndex {
    pub fields: Vec<FieldIndex>,
    pub row_ids: Vec<RowId>,    // doc_id -> row_id
}

impl InvertedIndex {
    pub fn new(num_fields: usize) -> Self {
        InvertedIndex {
            fields: (0..num_fields).map(|_| FieldIndex::default()).collect(),
            row_ids: Vec::new(),
        }
    }

    /// Append a document; `field_tokens[i]` holds the tokens of field `i`
    pub fn add_document(&mut self, row_id: RowId, field_tokens: Vec<Vec<Token>>) -> DocId {
        let doc_id = self.row_ids.len() as DocId;

        for (field, tokens) in self.fields.iter_mut().zip(field_tokens) {
            let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
            let doc_length = tokens.len() as u32;

            // Group tokens by term
            for token in tokens {
                term_positions.entry(token.text)
                    .or_default()
                    .push(token.position);
            }

            for (term, positions) in term_positions {
                field.postings.entry(term)
                    .or_default()
                    .add_posting(Posting::new(doc_id, positions));
            }

            field.doc_lengths.push(doc_length);
            field.total_tokens += doc_length as u64;
        }

        self.row_ids.push(row_id);
        doc_id
    }

    pub fn doc_count(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    /// Copy the live documents of a committed segment into this buffer,
    /// renumbering doc ids. Returns how many documents were copied.
    pub fn append_segment(&mut self, segment: &SegmentIndex, deleted: &RoaringTreemap) -> usize {
        let base = self.row_ids.len() as DocId;
        let mut remap: Vec<Option<DocId>> = Vec::with_capacity(segment.doc_count());
        for row_id in &segment.row_ids {
            if deleted.contains(row_id.0) {
                remap.push(None);
            } else {
                remap.push(Some(self.row_ids.len() as DocId));
                self.row_ids.push(*row_id);
            }
        }

        for (field, source) in self.fields.iter_mut().zip(&segment.fields) {
            for (old_doc, new_doc) in remap.iter().enumerate() {
                if new_doc.is_some() {
                    let length = source.doc_length(old_doc as DocId);
                    field.doc_lengths.push(length);
                    field.total_tokens += length as u64;
                }
            }

            for (term, ordinal) in source.dictionary.terms() {
                for posting in &source.postings[ordinal].postings {
                    if let Some(Some(doc_id)) = remap.get(posting.doc_id as usize).copied() {
                        field.postings.entry(term.clone())
                            .or_default()
                            .add_posting(Posting { doc_id, ..posting.clone() });
                    }
                }
            }
        }

        self.row_ids.len() - base as usize
    }

    pub fn clear(&mut self) {
        let num_fields = self.fields.len();
        *self = InvertedIndex::new(num_fields);
    }

    /// Serializable form with an FST term dictionary per field
    pub fn to_stored(&self) -> Result<StoredSegment> {
        let fields = self.fields.iter()
            .map(|field| {
                let dictionary = TermDictionary::build(field.postings.keys().map(|t| t.as_str()))?;
                Ok(StoredField {
                    term_dict: dictionary.as_bytes().to_vec(),
                    postings: field.postings.values().cloned().collect(),
                    doc_lengths: field.doc_lengths.clone(),
                    total_tokens: field.total_tokens,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StoredSegment {
            fields,
            row_ids: self.row_ids.iter().map(|r| r.0).collect(),
        })
    }
}

/// On-disk payload of one segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSegment {
    pub fields: Vec<StoredField>,
    pub row_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredField {
    pub term_dict: Vec<u8>,         // FST bytes, term -> ordinal
    pub postings: Vec<PostingList>, // Indexed by term ordinal
    pub doc_lengths: Vec<u32>,
    pub total_tokens: u64,
}

/// Read-only postings of one column of a committed segment
pub struct FieldPostings {
    pub dictionary: TermDictionary,
    pub postings: Vec<PostingList>,
    pub doc_lengths: Vec<u32>,
    pub total_tokens: u64,
}

impl FieldPostings {
    pub fn term(&self, term: &str) -> Option<&PostingList> {
        self.dictionary.get(term).and_then(|ordinal| self.postings.get(ordinal))
    }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(doc_id as usize).copied().unwrap_or(0)
    }
}

/// Immutable inverted index of one committed segment
pub struct SegmentIndex {
    pub fields: Vec<FieldPostings>,
    pub row_ids: Vec<RowId>,
}

impl SegmentIndex {
    pub fn from_stored(stored: StoredSegment, num_fields: usize) -> Result<Self> {
        if stored.fields.len() != num_fields {
            return Err(Error::corrupted(format!(
                "segment has {} fields, schema declares {}",
                stored.fields.len(),
                num_fields
            )));
        }

        let doc_count = stored.row_ids.len();
        let fields = stored.fields.into_iter()
            .map(|field| {
                let dictionary = TermDictionary::from_bytes(field.term_dict)?;
                if dictionary.len() != field.postings.len() || field.doc_lengths.len() != doc_count {
                    return Err(Error::corrupted("segment field sizes disagree"));
                }
                Ok(FieldPostings {
                    dictionary,
                    postings: field.postings,
                    doc_lengths: field.doc_lengths,
                    total_tokens: field.total_tokens,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SegmentIndex {
            fields,
            row_ids: stored.row_ids.into_iter().map(RowId).collect(),
        })
    }

    pub fn field(&self, field_id: FieldId) -> Option<&FieldPostings> {
        self.fields.get(field_id.as_usize())
    }

    pub fn row_id(&self, doc_id: DocId) -> RowId {
        self.row_ids[doc_id as usize]
    }

    pub fn doc_count(&self) -> usize {
        self.row_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<Token> {
        words.iter()
            .enumerate()
            .map(|(i, w)| Token::new(w.to_string(), i as u32, 0))
            .collect()
    }

    fn sample() -> InvertedIndex {
        let mut index = InvertedIndex::new(2);
        index.add_document(RowId(10), vec![tokens(&["red", "car"]), tokens(&["fast", "and", "red"])]);
        index.add_document(RowId(20), vec![tokens(&["blue", "bike"]), tokens(&["slow"])]);
        index
    }

    #[test]
    fn test_add_document_builds_postings() {
        let index = sample();
        assert_eq!(index.doc_count(), 2);
        let body = &index.fields[1];
        assert_eq!(body.postings["red"].get(0).unwrap().positions, vec![2]);
        assert_eq!(body.doc_lengths, vec![3, 1]);
        assert_eq!(body.total_tokens, 4);
    }

    #[test]
    fn test_stored_round_trip_keeps_lookups() {
        let stored = sample().to_stored().unwrap();
        let segment = SegmentIndex::from_stored(stored, 2).unwrap();

        let title = segment.field(FieldId(0)).unwrap();
        let red = title.term("red").unwrap();
        assert_eq!(red.doc_ids().collect::<Vec<_>>(), vec![0]);
        assert_eq!(segment.row_id(1), RowId(20));
        assert!(title.term("slow").is_none());
        assert_eq!(title.doc_length(1), 2);
    }

    #[test]
    fn test_append_segment_skips_deleted_rows() {
        let segment = SegmentIndex::from_stored(sample().to_stored().unwrap(), 2).unwrap();
        let mut deleted = RoaringTreemap::new();
        deleted.insert(10);

        let mut merged = InvertedIndex::new(2);
        merged.add_document(RowId(5), vec![tokens(&["red"]), Vec::new()]);
        assert_eq!(merged.append_segment(&segment, &deleted), 1);

        assert_eq!(merged.row_ids, vec![RowId(5), RowId(20)]);
        assert!(!merged.fields[0].postings.contains_key("car"));
        assert_eq!(merged.fields[0].postings["blue"].doc_ids().collect::<Vec<_>>(), vec![1]);
        assert_eq!(merged.fields[1].doc_lengths, vec![0, 1]);
        assert_eq!(merged.fields[1].total_tokens, 1);
    }

    #[test]
    fn test_field_count_mismatch_is_corruption() {
        let stored = sample().to_stored().unwrap();
        assert!(SegmentIndex::from_stored(stored, 3).is_err());
    }
}
