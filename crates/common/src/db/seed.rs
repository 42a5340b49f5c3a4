//! Sample library loaded into a fresh store
//!
//! Timestamps are relative to the moment the fixtures are built, so the
//! sample chats always look recent.

use super::models::*;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

/// Everything needed to seed an entity store
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub papers: Vec<Paper>,
    pub chats: Vec<Chat>,
    pub messages: Vec<Message>,
    pub facts: HashMap<PaperId, ResearchFacts>,
    pub repro_cards: HashMap<PaperId, ReproCard>,
    pub gaps: HashMap<PaperId, Vec<GapInsight>>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn hyperparams(pairs: &[(&str, &str)]) -> BTreeMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

impl Fixtures {
    /// The two-paper sample library
    pub fn sample(now: DateTime<Utc>) -> Self {
        let papers = vec![
            Paper {
                id: "paper-1".into(),
                title: "SimVLM: Simple Visual Language Model Pretraining with Weak Supervision".into(),
                authors: strings(&["Z. Chen", "R. Pang", "S. Xie", "N. Kalluri", "J. N. Devlin"]),
                venue: Some("ICLR".into()),
                year: Some(2022),
                doi: Some("10.48550/arXiv.2108.10904".into()),
                arxiv_id: Some("2108.10904".into()),
                status: PaperStatus::Indexed,
                pages: Some(18),
                thumb_url: None,
                added_at: now - Duration::days(7),
                size_in_kb: Some(3200),
            },
            Paper {
                id: "paper-2".into(),
                title: "DoReMi: Optimizing Data Mixtures Speeds Up Language Model Pretraining".into(),
                authors: strings(&["N. Santhanam", "Z. Dai", "Y. Tay", "S. Narang"]),
                venue: Some("NeurIPS".into()),
                year: Some(2023),
                doi: None,
                arxiv_id: None,
                status: PaperStatus::Indexed,
                pages: Some(24),
                thumb_url: None,
                added_at: now - Duration::days(30),
                size_in_kb: Some(4120),
            },
        ];

        let chats = vec![
            Chat {
                id: "chat-1".into(),
                name: "Dataset coverage analysis".into(),
                created_at: now - Duration::days(3),
                updated_at: now - Duration::hours(2),
                paper_ids: vec!["paper-1".into()],
                mode: ChatMode::Qa,
                folder_id: None,
            },
            Chat {
                id: "chat-2".into(),
                name: "Reviewer notes on DoReMi".into(),
                created_at: now - Duration::days(2),
                updated_at: now - Duration::hours(12),
                paper_ids: vec!["paper-2".into()],
                mode: ChatMode::Reviewer,
                folder_id: None,
            },
        ];

        let citations = vec![
            Citation {
                reference: 1,
                paper_id: "paper-1".into(),
                page: 5,
                snippet: "The ALIGN dataset accounts for 60% of pretraining examples, emphasizing web-scale weak supervision.".into(),
                speculative: None,
            },
            Citation {
                reference: 2,
                paper_id: "paper-1".into(),
                page: 7,
                snippet: "SimVLM achieves a 83.4 CIDEr score on COCO Captions without task-specific finetuning.".into(),
                speculative: None,
            },
        ];

        let messages = vec![
            Message::new(
                "chat-1-msg-1".into(),
                "chat-1".into(),
                Role::User,
                "What datasets were used to pretrain SimVLM?",
                now - Duration::minutes(45),
            ),
            Message::new(
                "chat-1-msg-2".into(),
                "chat-1".into(),
                Role::Assistant,
                "SimVLM relies primarily on the ALIGN corpus (weakly-labeled web image-text pairs) complemented by Conceptual Captions and additional web mixes for robustness. The paper stresses that ALIGN constitutes the majority of pretraining data, balancing scale with noisy supervision while smaller curated datasets cover long-tail phenomena.[1][2]",
                now - Duration::minutes(44),
            )
            .with_citations(citations),
            Message::new(
                "chat-1-msg-3".into(),
                "chat-1".into(),
                Role::User,
                "Any reproducibility red flags?",
                now - Duration::minutes(25),
            ),
        ];

        let mut facts = HashMap::new();
        facts.insert(
            "paper-1".to_string(),
            ResearchFacts {
                datasets: strings(&["ALIGN", "Conceptual Captions 3M", "COCO Captions"]),
                metrics: vec![
                    ReportedMetric { name: "CIDEr".into(), value: "83.4".into(), citation: Some(2) },
                    ReportedMetric { name: "BLEU-4".into(), value: "38.8".into(), citation: Some(2) },
                ],
                code_repositories: strings(&["https://github.com/google-research/simvlm"]),
                license: Some("Apache-2.0".into()),
            },
        );
        facts.insert(
            "paper-2".to_string(),
            ResearchFacts {
                datasets: strings(&["Pile", "C4", "Books"]),
                metrics: vec![
                    ReportedMetric { name: "Perplexity".into(), value: "15.2".into(), citation: Some(1) },
                    ReportedMetric { name: "Accuracy".into(), value: "67.5%".into(), citation: Some(1) },
                ],
                code_repositories: strings(&["https://github.com/google-research/doremi"]),
                license: Some("MIT".into()),
            },
        );

        let mut repro_cards = HashMap::new();
        repro_cards.insert(
            "paper-1".to_string(),
            ReproCard {
                task: "Vision-language pretraining".into(),
                model: "SimVLM (Base/1.4B)".into(),
                data: "ALIGN (1.8B pairs) + CC3M".into(),
                metrics: strings(&["CIDEr", "BLEU-4", "VQA accuracy"]),
                baselines: strings(&["ViT-GPT2", "OFA"]),
                hardware: "TPU v4 Pods".into(),
                hyperparams: hyperparams(&[
                    ("optimizer", "Adam"),
                    ("lr", "1e-4 warmup, cosine decay"),
                    ("batch_size", "4096"),
                ]),
                ablations: strings(&["Data mixture ratios", "Caption length truncation"]),
            },
        );
        repro_cards.insert(
            "paper-2".to_string(),
            ReproCard {
                task: "Language model pretraining efficiency".into(),
                model: "DoReMi mixture policy".into(),
                data: "Mixture of Pile, C4, curated corpora".into(),
                metrics: strings(&["Valid perplexity", "BIG-bench hard score"]),
                baselines: strings(&["Uniform sampling", "Temperature-based sampling"]),
                hardware: "A100 (32GB) cluster".into(),
                hyperparams: hyperparams(&[
                    ("optimizer", "AdamW"),
                    ("lr", "5e-4"),
                    ("batch_size", "2048 tokens per device"),
                ]),
                ablations: strings(&["Mixture adaptation steps", "Reward smoothing"]),
            },
        );

        let mut gaps = HashMap::new();
        gaps.insert(
            "paper-1".to_string(),
            vec![
                GapInsight {
                    id: "gap-1".into(),
                    label: GapLabel::Grounded,
                    summary: "Reproducibility limited by access to ALIGN data; paper does not provide sampling shards or licensing details.".into(),
                    citation: Some(1),
                },
                GapInsight {
                    id: "gap-2".into(),
                    label: GapLabel::Speculative,
                    summary: "Alignment strategy may struggle with low-resource languages due to English-dominant captions.".into(),
                    citation: Some(2),
                },
            ],
        );
        gaps.insert(
            "paper-2".to_string(),
            vec![GapInsight {
                id: "gap-3".into(),
                label: GapLabel::Grounded,
                summary: "Training cost estimates are reported without variance, making budgeting uncertain.".into(),
                citation: Some(1),
            }],
        );

        Self {
            papers,
            chats,
            messages,
            facts,
            repro_cards,
            gaps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EntityStore, MemoryStore};

    #[tokio::test]
    async fn test_seeded_store() {
        let store = MemoryStore::with_fixtures(Fixtures::sample(Utc::now()));

        let papers = store.list_papers().await.unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].id, "paper-1");

        let chats = store.list_chats().await.unwrap();
        assert_eq!(chats[0].id, "chat-1");

        let messages = store.list_messages("chat-1").await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].citations.as_ref().map(Vec::len), Some(2));
        assert!(store.list_messages("chat-2").await.unwrap().is_empty());

        assert_eq!(store.get_gaps("paper-1").await.unwrap().len(), 2);
        let card = store.get_repro_card("paper-2").await.unwrap().unwrap();
        assert_eq!(card.hyperparams["optimizer"], "AdamW");
        let facts = store.get_facts("paper-1").await.unwrap().unwrap();
        assert_eq!(facts.license.as_deref(), Some("Apache-2.0"));
    }
}
