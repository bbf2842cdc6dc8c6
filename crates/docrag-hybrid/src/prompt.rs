//! Prompt assembly for the downstream generation backend.
//!
//! The engine never calls an LLM itself; it hands the backend a request
//! that carries the tagged context and, when evidence is insufficient, an
//! explicit refusal instruction. The sufficiency signal is therefore never
//! silently omitted from what generation sees.

use docrag_core::types::Evidence;

pub const SYSTEM_PROMPT: &str = "You are an assistant answering questions over a private document \
     corpus. Answer only from the provided extracts. If the extracts do not \
     contain the information, say clearly that you cannot answer with \
     certainty and suggest which document or detail to ask for. Cite your \
     sources as [doc_id::chunk_id]. Do not give definitive legal advice; \
     propose a cautious wording instead.";

pub const REFUSAL_ANSWER: &str = "I cannot answer reliably: no sufficiently relevant extract was found \
     in the document base for this question.";

/// What the generation backend receives for one question.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    /// When set, generation must emit a refusal regardless of what the
    /// model would otherwise produce.
    pub must_refuse: bool,
}

pub fn build_prompt(question: &str, evidence: &Evidence) -> GenerationRequest {
    if !evidence.sufficient {
        return GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "No sufficient evidence was retrieved for the question below. \
                 Respond exactly with a refusal in the spirit of: \
                 \"{REFUSAL_ANSWER}\"\n\nQuestion:\n{question}\n"
            ),
            must_refuse: true,
        };
    }

    GenerationRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "Extracts (document base):\n{}\n\nUser question:\n{}\n\n\
             Answer rules:\n\
             - Answer concisely and structured (a few bullet points plus one cautious closing sentence).\n\
             - Every substantive claim must be supported by a citation [doc_id::chunk_id].\n\
             - If a piece of information is missing from the extracts, say so explicitly.\n",
            evidence.context, question
        ),
        must_refuse: false,
    }
}
