use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::knowledge::{Document, KnowledgeBase};
use crate::text::{document_frequency, term_frequencies, tokenize};

/// Term-frequency saturation.
pub const K1: f64 = 1.5;
/// Document-length normalisation.
pub const B: f64 = 0.75;

/// A document paired with its relevance to one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument<'a> {
    #[serde(flatten)]
    pub document: &'a Document,
    pub score: f64,
}

/// Per-query corpus figures needed to score one document.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub df: &'a HashMap<String, usize>,
    pub avg_doc_len: f64,
    pub total_docs: usize,
}

/// BM25 score of one document. Query terms absent from the document add 0.
pub fn bm25_score(
    query_tokens: &[String],
    doc_tf: &HashMap<String, usize>,
    doc_len: usize,
    ctx: ScoringContext<'_>,
) -> f64 {
    let avg_doc_len = if ctx.avg_doc_len > 0.0 {
        ctx.avg_doc_len
    } else {
        1.0
    };
    let total_docs = ctx.total_docs as f64;

    query_tokens
        .iter()
        .filter_map(|token| {
            let tf = *doc_tf.get(token)? as f64;
            let df = ctx.df.get(token).copied().unwrap_or(0) as f64;
            let idf = (1.0 + (total_docs - df + 0.5) / (df + 0.5)).ln();
            let denom = tf + K1 * (1.0 - B + B * doc_len as f64 / avg_doc_len);
            Some(idf * (tf * (K1 + 1.0) / denom))
        })
        .sum()
}

/// Corpus statistics are computed once in `new` and only read afterwards.
pub struct Bm25Retriever {
    kb: KnowledgeBase,
    doc_lens: Vec<usize>,
    doc_tfs: Vec<HashMap<String, usize>>,
    df: HashMap<String, usize>,
    avg_len: f64,
}

impl Bm25Retriever {
    /// Bind a retriever to `kb`, tokenising every document once.
    pub fn new(kb: KnowledgeBase) -> Self {
        let doc_tokens = kb.tokenised_documents();
        let doc_tfs = doc_tokens.iter().map(|t| term_frequencies(t)).collect();
        let df = document_frequency(&doc_tokens);
        let doc_lens: Vec<usize> = doc_tokens.iter().map(Vec::len).collect();
        let avg_len = doc_lens.iter().sum::<usize>() as f64 / doc_lens.len().max(1) as f64;

        Self {
            kb,
            doc_lens,
            doc_tfs,
            df,
            avg_len,
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn average_document_length(&self) -> f64 {
        self.avg_len
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.df.get(term).copied().unwrap_or(0)
    }

    /// Rank documents against `query`, best first.
    ///
    /// Only documents scoring above zero are returned, at most `top_k` of
    /// them (a `top_k` of 0 is treated as 1). Equal scores keep corpus order.
    pub fn rank(&self, query: &str, top_k: usize) -> Vec<RankedDocument<'_>> {
        let top_k = top_k.max(1);
        let query_tokens = tokenize(query, true);
        let ctx = ScoringContext {
            df: &self.df,
            avg_doc_len: self.avg_len,
            total_docs: self.kb.len(),
        };

        let mut results: Vec<RankedDocument<'_>> = self
            .kb
            .iter()
            .zip(self.doc_lens.iter().zip(&self.doc_tfs))
            .filter(|(_, (len, _))| **len > 0)
            .filter_map(|(document, (&len, tf))| {
                let score = bm25_score(&query_tokens, tf, len, ctx);
                (score > 0.0).then_some(RankedDocument { document, score })
            })
            .collect();

        // Vec::sort_by is stable.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);
        results
    }
}
