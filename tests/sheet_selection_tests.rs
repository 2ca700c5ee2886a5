
use feedq::{Error, Fault, Record};
use serde_json::json;
use test_data_gen::{articles, client, ids, SITE};

fn nav() -> Vec<Record> {
    ["Home", "News", "Sports"]
        .iter()
        .map(|label| Record::from_pairs([("label", *label)]))
        .collect()
}

#[tokio::test]
async fn test_selects_named_sheet() {
    let mem = feedq::MemorySource::new();
    mem.insert_sheets(SITE, vec![("nav", nav()), ("articles", articles(9))]);

    let mut q = client(&mem, 4)
        .open(SITE)
        .unwrap()
        .sheet("articles")
        .unwrap()
        .filter_expr("section == sports")
        .unwrap();
    assert_eq!(ids(&q.all().await.unwrap()), [1, 5]);

    // Paging follows the selected sheet's total, not the longest sheet.
    assert_eq!(mem.fetch_count(SITE), 3);
    assert!(mem
        .requests()
        .iter()
        .all(|r| r.sheet.as_deref() == Some("articles")));
}

#[tokio::test]
async fn test_unknown_sheet_fails_on_first_fetch() {
    let mem = feedq::MemorySource::new();
    mem.insert_sheets(SITE, vec![("nav", nav())]);

    let mut q = client(&mem, 4).open(SITE).unwrap().sheet("footer").unwrap();
    assert!(mem.requests().is_empty());

    let err = q.all().await.unwrap_err();
    assert_eq!(
        err,
        Error::SheetNotFound {
            path: SITE.into(),
            sheet: "footer".into(),
        }
    );
    assert_eq!(mem.fetch_count(SITE), 1);
}

#[tokio::test]
async fn test_no_selector_prefers_default_sheet() {
    let mem = feedq::MemorySource::new();
    mem.insert_sheets(SITE, vec![("nav", nav()), ("default", articles(2))]);

    let mut q = client(&mem, 10).open(SITE).unwrap();
    assert_eq!(ids(&q.all().await.unwrap()), [0, 1]);
}

#[tokio::test]
async fn test_no_selector_falls_back_to_first_sheet() {
    let mem = feedq::MemorySource::new();
    mem.insert_sheets(SITE, vec![("nav", nav()), ("articles", articles(2))]);

    let mut q = client(&mem, 10).open(SITE).unwrap();
    let labels: Vec<String> = q
        .all()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.get_str("label").map(str::to_string))
        .collect();
    assert_eq!(labels, ["Home", "News", "Sports"]);
}

#[tokio::test]
async fn test_single_sheet_body_accepts_sheet_param() {
    let mem = test_data_gen::memory_with_index(3);
    let mut q = client(&mem, 10)
        .open(test_data_gen::INDEX)
        .unwrap()
        .sheet("articles")
        .unwrap();
    assert_eq!(q.all().await.unwrap().len(), 3);
    assert_eq!(mem.requests()[0].sheet.as_deref(), Some("articles"));
}

#[tokio::test]
async fn test_sheet_is_fixed_once_consumed() {
    let mem = feedq::MemorySource::new();
    mem.insert_sheets(SITE, vec![("nav", nav())]);

    let mut q = client(&mem, 10).open(SITE).unwrap();
    q.first().await.unwrap();
    assert!(matches!(
        q.sheet("nav"),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[tokio::test]
async fn test_broken_sibling_sheet_is_ignored() {
    let mem = feedq::MemorySource::new();
    mem.insert_sheets(SITE, vec![("nav", nav())]);
    mem.fail_at(
        SITE,
        0,
        Fault::Body(json!({
            ":names": ["nav", "broken"],
            "nav": {"total": 1, "offset": 0, "limit": 10, "data": [{"label": "Home"}]},
            "broken": {"total": 4, "offset": 0}
        })),
    );

    let mut nav_query = client(&mem, 10).open(SITE).unwrap().sheet("nav").unwrap();
    assert_eq!(nav_query.all().await.unwrap().len(), 1);

    let mut broken = client(&mem, 10).open(SITE).unwrap().sheet("broken").unwrap();
    assert!(matches!(
        broken.all().await,
        Err(Error::MalformedEnvelope { offset: 0, .. })
    ));
}
