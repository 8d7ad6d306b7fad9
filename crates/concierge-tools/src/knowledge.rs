//! Knowledge retrieval behind the `search_hotel_info` tool.
//!
//! [`KnowledgeStore`] is the retrieval seam; the provided
//! [`MemoryKnowledgeStore`] chunks markdown documents by `##` section
//! headings and ranks chunks by term overlap with the query. Embedding-based
//! retrieval lives behind the same trait in deployments that need it.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use concierge_gateway::ToolSpec;
use concierge_types::ToolError;

use crate::registry::{Tool, parse_args};

const NO_RESULTS_NOTE: &str = "No relevant information found in the hotel knowledge base.";

/// One retrieved chunk with its relevance score in `[0, 1]`.
#[derive(Debug, Clone, Serialize)]
pub struct Passage {
    pub category: String,
    pub section: String,
    pub content: String,
    pub score: f64,
}

/// Retrieval capability over the hotel knowledge base.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Best-matching passages for a query, most relevant first.
    async fn search(&self, query: &str, top_k: usize) -> Vec<Passage>;

    /// Number of documents loaded into the store.
    fn document_count(&self) -> usize;
}

struct Chunk {
    category: String,
    section: String,
    content: String,
    terms: BTreeSet<String>,
}

/// In-memory store over markdown documents.
#[derive(Default)]
pub struct MemoryKnowledgeStore {
    documents: usize,
    chunks: Vec<Chunk>,
}

impl MemoryKnowledgeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store loaded with the builtin hotel documents.
    #[must_use]
    pub fn seeded() -> Self {
        let mut store = Self::new();
        for (category, markdown) in seed_documents() {
            store.add_document(category, markdown);
        }
        store
    }

    /// Split a markdown document into section chunks and add them under the
    /// given category.
    pub fn add_document(&mut self, category: &str, markdown: &str) {
        self.documents += 1;
        for (section, content) in split_sections(markdown) {
            let terms = tokenize(&content);
            self.chunks.push(Chunk {
                category: category.to_string(),
                section,
                content,
                terms,
            });
        }
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn search(&self, query: &str, top_k: usize) -> Vec<Passage> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<Passage> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let overlap = query_terms.intersection(&chunk.terms).count();
                if overlap == 0 {
                    return None;
                }
                Some(Passage {
                    category: chunk.category.clone(),
                    section: chunk.section.clone(),
                    content: chunk.content.clone(),
                    score: overlap as f64 / query_terms.len() as f64,
                })
            })
            .collect();

        // Stable sort: ties keep document order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored
    }

    fn document_count(&self) -> usize {
        self.documents
    }
}

/// Split markdown into `(section, content)` chunks on `## ` headings.
///
/// The heading line stays part of the chunk content. Text before the first
/// heading becomes a chunk with an empty section name; a document with no
/// headings at all becomes a single chunk with the section `full`.
fn split_sections(markdown: &str) -> Vec<(String, String)> {
    let mut chunks = Vec::new();
    let mut section = String::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            let text = lines.join("\n").trim().to_string();
            if !text.is_empty() {
                chunks.push((section.clone(), text));
            }
            section = heading.trim().to_string();
            lines = vec![line];
        } else {
            lines.push(line);
        }
    }

    let text = lines.join("\n").trim().to_string();
    if !text.is_empty() {
        chunks.push((section, text));
    }

    if chunks.is_empty() {
        chunks.push(("full".to_string(), markdown.trim().to_string()));
    }

    chunks
}

const STOPWORDS: &[&str] = &[
    "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how", "in",
    "is", "it", "my", "of", "on", "or", "our", "the", "to", "we", "what", "when", "where", "with",
    "you", "your",
];

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|token| token.len() >= 2 && !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// `search_hotel_info`: retrieval tool over a [`KnowledgeStore`].
pub struct SearchHotelInfo {
    knowledge: Arc<dyn KnowledgeStore>,
    default_top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchHotelInfoArgs {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

impl SearchHotelInfo {
    #[must_use]
    pub fn new(knowledge: Arc<dyn KnowledgeStore>, default_top_k: usize) -> Self {
        Self {
            knowledge,
            default_top_k,
        }
    }
}

#[async_trait]
impl Tool for SearchHotelInfo {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "search_hotel_info",
            "Search the hotel knowledge base for information about policies, rooms, \
             facilities, or FAQs.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The guest's question or topic to search for."},
                    "top_k": {"type": "integer", "description": "Number of passages to return."}
                },
                "required": ["query"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: SearchHotelInfoArgs = parse_args(arguments)?;
        let top_k = args
            .top_k
            .filter(|k| *k > 0)
            .unwrap_or(self.default_top_k);
        let passages = self.knowledge.search(&args.query, top_k).await;

        if passages.is_empty() {
            return Ok(json!({"passages": [], "note": NO_RESULTS_NOTE}));
        }
        Ok(json!({"passages": passages}))
    }
}

/// Builtin hotel documents, in the category order they load.
fn seed_documents() -> Vec<(&'static str, &'static str)> {
    vec![
        ("facilities", FACILITIES_DOC),
        ("faq", FAQ_DOC),
        ("policies", POLICIES_DOC),
        ("rooms", ROOMS_DOC),
    ]
}

const FACILITIES_DOC: &str = "\
## Pool and Fitness
The rooftop pool is open from 7:00 AM to 9:00 PM daily. The fitness center is open
around the clock with keycard access. Towels are provided at both.

## Spa
The spa offers treatments daily from 9:00 AM to 8:00 PM. A 60-minute Swedish massage
is $120. Book at the front desk or through the spa extension 4040.

## Dining
The Garden Restaurant serves breakfast from 6:30 to 10:30 AM; the breakfast buffet is
$28 per person. Dinner is served from 5:30 to 10:00 PM. Room service runs 24 hours
with an $8 delivery charge.

## Parking and Transport
Valet parking is $45 per night with in-and-out privileges. Self-parking is $30 per
night. The airport shuttle departs hourly from the main entrance between 5:30 AM and
11:30 PM; seats are complimentary but must be reserved at the front desk.

## Business and Events
Two meeting rooms seat up to 40 people each and can be reserved by the hour at the
front desk. Printing and copying are available at the business corner in the lobby.
";

const FAQ_DOC: &str = "\
## WiFi Access
Complimentary WiFi is available in all rooms and public areas. Connect to the
HOTEL-GUEST network and sign in with your room number and last name.

## Quiet Hours
Quiet hours run from 10:00 PM to 7:00 AM in all guest corridors.

## Late Check-out
Late check-out until 2:00 PM can be requested the night before, subject to
availability, for $50. Penthouse guests receive complimentary late check-out.

## Lost and Found
Items found in rooms are held for 90 days. Contact the front desk to arrange
return shipping.

## Children and Extra Beds
Children 12 and under stay free in existing bedding. Cribs are free on request;
rollaway beds are available in suites for $30 per night within the room's
maximum occupancy.
";

const POLICIES_DOC: &str = "\
## Check-in and Check-out
Check-in begins at 3:00 PM. Check-out is at 11:00 AM. Early check-in is subject to
availability.

## Cancellation Policy
Reservations can be cancelled free of charge up to 48 hours before check-in. Later
cancellations are charged one night. Refunds are returned to the original payment
method within 5-7 business days.

## Payment and Deposits
All major credit cards are accepted. A hold for one night's rate is placed at
booking and released at check-out, when the full balance is settled.

## Pets
Dogs and cats up to 25 pounds are welcome in standard and deluxe rooms for a $40
cleaning fee per stay. Service animals stay free in all room types.

## Smoking
All rooms and indoor areas are non-smoking; a $250 recovery fee applies. Designated
outdoor smoking areas are located by the garden terrace.

## Promotions
Promotional codes are applied to the open bill before payment. Ask the billing desk
to apply a current code such as WELCOME10 for 10% off.
";

const ROOMS_DOC: &str = "\
## Room Types and Rates
The hotel offers six room types. Standard Room, $149 per night for up to 2 guests.
Deluxe Room, $219 for up to 3. Premium Suite, $349 for up to 4. Family Suite, $299
for up to 5. Penthouse Suite, $599 for up to 4. Accessible Room, $149 for up to 2.

## Standard and Accessible Rooms
Standard and accessible rooms include WiFi, a 42\" TV, a mini-fridge, a coffee
maker, and an in-room safe. Accessible rooms add a roll-in shower and grab bars
and sit close to the elevators.

## Suites
The Premium Suite features a jacuzzi, a Nespresso machine, and bathrobes. The
Family Suite sleeps five with two TVs, a microwave, and board games. The Penthouse
Suite includes a full bar, butler service, and a private balcony.

## Views and Floors
Rooms on floors 8 and above face the waterfront. High-floor requests are honored
at check-in when available and carry no charge.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitter_chunks_on_section_headings() {
        let chunks = split_sections("## One\nalpha\n\n## Two\nbeta\ngamma\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, "One");
        assert_eq!(chunks[0].1, "## One\nalpha");
        assert_eq!(chunks[1].0, "Two");
        assert!(chunks[1].1.contains("gamma"));
    }

    #[test]
    fn splitter_keeps_preamble_with_empty_section() {
        let chunks = split_sections("# Title\nintro text\n\n## One\nalpha\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, "");
        assert!(chunks[0].1.contains("intro text"));
    }

    #[test]
    fn splitter_falls_back_to_whole_document() {
        let chunks = split_sections("just a paragraph with no headings");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].0, "full");
    }

    #[test]
    fn seeded_store_counts_documents_not_chunks() {
        let store = MemoryKnowledgeStore::seeded();
        assert_eq!(store.document_count(), 4);
        assert!(store.chunk_count() > 4);
    }

    #[tokio::test]
    async fn search_ranks_by_term_overlap() {
        let store = MemoryKnowledgeStore::seeded();
        let passages = store.search("rooftop pool", 3).await;
        assert!(!passages.is_empty());
        assert_eq!(passages[0].section, "Pool and Fitness");
        assert_eq!(passages[0].category, "facilities");
        assert!(passages[0].score > 0.9);
    }

    #[tokio::test]
    async fn search_heading_terms_match() {
        let store = MemoryKnowledgeStore::seeded();
        let passages = store.search("cancellation policy", 3).await;
        assert_eq!(passages[0].section, "Cancellation Policy");
        assert_eq!(passages[0].category, "policies");
    }

    #[tokio::test]
    async fn search_returns_nothing_for_unrelated_or_empty_queries() {
        let store = MemoryKnowledgeStore::seeded();
        assert!(store.search("quantum blockchain kayak", 3).await.is_empty());
        assert!(store.search("", 3).await.is_empty());
        assert!(store.search("the and of", 3).await.is_empty());
    }

    #[tokio::test]
    async fn search_respects_top_k() {
        let store = MemoryKnowledgeStore::seeded();
        let passages = store.search("check-in check-out hours", 1).await;
        assert_eq!(passages.len(), 1);
    }

    #[tokio::test]
    async fn tool_wraps_passages_and_no_result_note() {
        let store: Arc<dyn KnowledgeStore> = Arc::new(MemoryKnowledgeStore::seeded());
        let tool = SearchHotelInfo::new(store, 3);

        let payload = tool
            .invoke(json!({"query": "breakfast buffet"}))
            .await
            .unwrap();
        let passages = payload["passages"].as_array().unwrap();
        assert!(!passages.is_empty());
        assert!(payload.get("note").is_none());

        let payload = tool
            .invoke(json!({"query": "quantum blockchain kayak"}))
            .await
            .unwrap();
        assert!(payload["passages"].as_array().unwrap().is_empty());
        assert_eq!(payload["note"], NO_RESULTS_NOTE);
    }

    #[tokio::test]
    async fn tool_honors_top_k_override() {
        let store: Arc<dyn KnowledgeStore> = Arc::new(MemoryKnowledgeStore::seeded());
        let tool = SearchHotelInfo::new(store, 3);
        let payload = tool
            .invoke(json!({"query": "front desk", "top_k": 1}))
            .await
            .unwrap();
        assert_eq!(payload["passages"].as_array().unwrap().len(), 1);
    }
}
