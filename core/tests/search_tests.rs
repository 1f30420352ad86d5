use ticket_core::search::search;
use ticket_core::{Document, Index, LanguageCatalog, Query};

fn ticket(id: &str, subject: &str, body: &str) -> Document {
    Document {
        id: id.into(),
        subject: subject.into(),
        body: body.into(),
        answer: format!("answer for {id}"),
        language: "en".into(),
    }
}

fn helpdesk() -> Vec<Document> {
    vec![
        ticket("D1", "printer", "printer not turning on"),
        ticket("D2", "network", "cannot connect to wifi network"),
        ticket("D3", "account", "password reset request"),
        ticket("D4", "email", "outlook keeps asking for my password after the update"),
        ticket("D5", "hardware", "laptop battery drains quickly when docked"),
    ]
}

fn build(docs: Vec<Document>) -> Index {
    let catalog = LanguageCatalog::default();
    let en = catalog.resolve("en").unwrap();
    Index::build(docs, en, &catalog).unwrap()
}

#[test]
fn every_document_finds_itself() {
    let index = build(helpdesk());
    for doc in index.documents() {
        let hit = search(&Query::from(doc), &index).unwrap();
        assert_eq!(hit.document.id, doc.id);
        assert!((hit.score - 1.0).abs() < 1e-9, "{} scored {}", doc.id, hit.score);
    }
}

#[test]
fn wifi_query_matches_network_ticket() {
    let index = build(vec![
        ticket("D1", "", "printer not turning on"),
        ticket("D2", "", "cannot connect to wifi network"),
        ticket("D3", "", "password reset request"),
    ]);
    let query = Query::new("wifi", "cannot connect to the network", "en");
    let hit = search(&query, &index).unwrap();
    assert_eq!(hit.document.id, "D2");
    assert_eq!(hit.document.answer, "answer for D2");
    assert!(hit.score > 0.0 && hit.score < 1.0);

    let q = index.vectorize("wifi cannot connect to the network");
    for (row, doc) in index.matrix().rows().iter().zip(index.documents()) {
        if doc.id != "D2" {
            assert!(q.dot(row) < hit.score);
        }
    }
}

#[test]
fn builds_are_deterministic() {
    let a = build(helpdesk());
    let b = build(helpdesk());
    assert_eq!(a.model().terms(), b.model().terms());
    assert_eq!(a.model().idf(), b.model().idf());
    assert_eq!(a.matrix(), b.matrix());

    let query = Query::new("outlook", "password prompt after update", "en");
    let ha = search(&query, &a).unwrap();
    let hb = search(&query, &b).unwrap();
    assert_eq!(ha.document.id, hb.document.id);
    assert_eq!(ha.score.to_bits(), hb.score.to_bits());
}

#[test]
fn out_of_vocabulary_query_scores_zero_on_first_row() {
    let index = build(helpdesk());
    let hit = search(&Query::new("zzzqx", "blorptastic frobnication", "en"), &index).unwrap();
    assert_eq!(hit.score, 0.0);
    assert_eq!(hit.row, 0);
    assert_eq!(hit.document.id, "D1");
}

#[test]
fn empty_and_stopword_only_queries_are_degenerate_not_errors() {
    let index = build(helpdesk());
    for query in [Query::new("", "", "en"), Query::new("the", "and of to", "en")] {
        let hit = search(&query, &index).unwrap();
        assert_eq!(hit.score, 0.0);
        assert_eq!(hit.row, 0);
    }
}

#[test]
fn answer_is_never_indexed() {
    let mut docs = helpdesk();
    docs[0].answer = "firmware rollback procedure".into();
    let index = build(docs);
    assert!(index.model().column("firmware").is_none());
    assert!(index.model().column("printer").is_some());
}

#[test]
fn shared_terms_rank_closer_documents_higher() {
    let index = build(helpdesk());
    let hit = search(&Query::new("", "my password needs a reset", "en"), &index).unwrap();
    assert_eq!(hit.document.id, "D3");
}
