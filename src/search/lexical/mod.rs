
use std::collections::HashMap;
use tracing::debug;

/// Term-frequency saturation constant. Higher values let repeated terms keep
/// contributing; 1.5 is the conventional BM25 default.
pub const DEFAULT_K1: f32 = 1.5;
/// Length-normalization constant in `[0, 1]`. 0 disables length
/// normalization entirely, 1 normalizes fully by relative chunk length.
pub const DEFAULT_B: f32 = 0.75;

/// BM25-style keyword index over one namespace's chunk texts.
///
/// Tokenization is deliberately minimal: lower-case, split on whitespace, no
/// stemming, no stopword removal. Corpora are small and what matters is that
/// index-time and query-time tokenization stay symmetric.
///
/// The index is rebuilt from the full chunk set on every ingestion rather
/// than updated incrementally; ingestion batches are infrequent and a rebuild
/// over a course-sized corpus is cheap.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    k1: f32,
    b: f32,
    docs: Vec<DocEntry>,
    doc_freq: HashMap<String, u32>,
    avg_len: f32,
}

#[derive(Debug, Clone)]
struct DocEntry {
    chunk_id: i64,
    len: u32,
    term_freq: HashMap<String, u32>,
}

impl LexicalIndex {
    #[inline]
    pub fn new(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            docs: Vec::new(),
            doc_freq: HashMap::new(),
            avg_len: 0.0,
        }
    }

    /// Rebuild the index over the complete current chunk set.
    #[inline]
    pub fn rebuild<'a, I>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = (i64, &'a str)>,
    {
        self.docs.clear();
        self.doc_freq.clear();

        let mut total_len: u64 = 0;
        for (chunk_id, text) in chunks {
            let tokens = tokenize(text);
            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_len += tokens.len() as u64;
            self.docs.push(DocEntry {
                chunk_id,
                len: tokens.len() as u32,
                term_freq,
            });
        }

        self.avg_len = if self.docs.is_empty() {
            0.0
        } else {
            total_len as f32 / self.docs.len() as f32
        };

        debug!(
            "Rebuilt lexical index: {} chunks, {} distinct terms, avg length {:.1}",
            self.docs.len(),
            self.doc_freq.len(),
            self.avg_len
        );
    }

    /// Return up to `top_k` `(chunk_id, score)` pairs with strictly positive
    /// BM25 scores, ordered by score descending with ties broken by ascending
    /// chunk id. An unbuilt index or a query with no matching terms yields an
    /// empty vector.
    #[inline]
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(i64, f32)> {
        if self.docs.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let corpus_size = self.docs.len() as f32;
        let mut scored: Vec<(i64, f32)> = Vec::new();

        for doc in &self.docs {
            let mut score = 0.0;
            for term in &query_terms {
                let Some(&tf) = doc.term_freq.get(term) else {
                    continue;
                };
                let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
                // BM25+ style idf, always positive so rare terms dominate
                // without common terms flipping negative.
                let idf = ((corpus_size - df + 0.5) / (df + 0.5) + 1.0).ln();
                let tf = tf as f32;
                let length_norm = 1.0 - self.b + self.b * doc.len as f32 / self.avg_len;
                score += idf * tf * (self.k1 + 1.0) / (tf + self.k1 * length_norm);
            }
            if score > 0.0 {
                scored.push((doc.chunk_id, score));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        scored
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Default for LexicalIndex {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_K1, DEFAULT_B)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}
