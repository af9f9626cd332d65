//! Library API integration tests
use legible_core::scoring::CandidateScores;
use legible_core::*;
use rstest::rstest;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn long_paragraphs(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "<p>Paragraph {i} explains the subject in full sentences, with commas, clauses, and enough detail to be worth reading on its own.</p>"
            )
        })
        .collect()
}

#[test]
fn test_article_next_to_navigation() {
    let article = parse(fixture("article.html").as_str(), None, None)
        .expect("should parse")
        .expect("should find an article");

    assert!(article.length >= 500);
    assert_eq!(article.length, article.text_content.chars().count());
    for nav_text in ["Horoscopes", "Crosswords", "Subscribe", "Most read", "Wonderful news", "Privacy"] {
        assert!(!article.content.contains(nav_text), "content leaked {nav_text:?}");
    }
    assert!(article.text_content.contains("spraint on the stones below the old mill"));
    assert!(article.content.starts_with(r#"<div id="readability-page-1" class="page">"#));
}

#[test]
fn test_article_metadata() {
    let article = parse(fixture("article.html").as_str(), None, None).unwrap().unwrap();

    assert_eq!(article.title, "The Quiet Return of the River Otters");
    assert_eq!(article.byline.as_deref(), Some("Jane Smith"));
    assert_eq!(
        article.excerpt,
        "After decades of absence, otters are breeding again along the upper river."
    );
    assert_eq!(article.site_name.as_deref(), Some("Riverside Gazette"));
    assert_eq!(article.published_time.as_deref(), Some("2024-03-18T09:15:00Z"));
    assert_eq!(article.language.as_deref(), Some("en-GB"));
    assert_eq!(article.direction, Some(TextDirection::Ltr));
}

#[test]
fn test_navigation_only_page() {
    let html = fixture("nav_footer.html");
    assert!(!is_probably_readerable(html.as_str()));
    assert_eq!(check_availability(html.as_str()), ReaderAvailability::Unavailable);
    assert!(parse(html.as_str(), None, None).unwrap().is_none());
}

#[test]
fn test_og_title_beats_document_title() {
    let html = format!(
        r#"<html><head><title>Foo | Example Site</title><meta property="og:title" content="Foo"></head>
        <body><article>{}</article></body></html>"#,
        long_paragraphs(6)
    );
    let article = parse(html.as_str(), None, None).unwrap().unwrap();
    assert_eq!(article.title, "Foo");
}

#[test]
fn test_element_limit() {
    let html = format!("<html><body>{}</body></html>", "<span>x</span>".repeat(50));
    let options = ParseOptions::builder().max_elems_to_parse(5).build();

    match parse(html.as_str(), None, Some(options)) {
        Err(LegibleError::DocumentTooLarge { count, max }) => {
            assert_eq!(max, 5);
            assert!(count >= 50);
        }
        other => panic!("expected DocumentTooLarge, got {other:?}"),
    }
}

#[test]
fn test_link_density_reorders_candidates() {
    let text = "Plain words that carry the meaning of the paragraph without links.";
    let html = format!(
        r##"<body><div id="linky"><p>{text} <a href="/elsewhere">a long link that covers a good share of the text</a></p></div><div id="plain"><p>{text}</p></div></body>"##
    );
    let doc = Document::parse(&html).unwrap();
    let linky = doc.query_selector_all("#linky").unwrap()[0];
    let plain = doc.query_selector_all("#plain").unwrap()[0];

    let mut scores = CandidateScores::new();
    scores.set(linky, 100.0);
    scores.set(plain, 95.0);
    scores.apply_link_density(&doc);

    let ranked = scores.top_candidates(&doc, 5);
    assert_eq!(ranked[0].0, plain);
    assert_eq!(ranked[0].1, 95.0);
    assert!(ranked[1].1 < 95.0);
}

#[test]
fn test_link_heavy_container_loses_to_prose() {
    let links: String = (0..8)
        .map(|i| {
            format!(
                r#"<p><a href="/story/{i}">Story {i}, breaking, live, photos, video, analysis, opinion, reaction, updates, more</a> here.</p>"#
            )
        })
        .collect();
    let prose = long_paragraphs(8);
    let html = format!(
        r#"<html><head><title>Page</title></head><body>
            <div><div><div id="links">{links}</div></div></div>
            <div><div><div id="prose">{prose}</div></div></div>
        </body></html>"#
    );

    let doc = Document::parse(&html).unwrap();
    let raw = |selector: &str| -> f64 {
        doc.query_selector_all(selector)
            .unwrap()
            .into_iter()
            .map(|p| scoring::content_score(&scoring::inner_text(&doc, p)))
            .sum()
    };
    assert!(raw("#links > p") > raw("#prose > p"));

    let article = parse(html.as_str(), None, None).unwrap().unwrap();
    assert!(article.text_content.contains("Paragraph 0 explains the subject"));
    assert!(article.text_content.contains("Paragraph 7 explains the subject"));
    assert!(!article.content.contains("breaking, live"));
    assert!(!article.content.contains("/story/"));
}

#[rstest]
#[case("article.html")]
#[case("json_ld.html")]
#[case("rtl.html")]
#[case("nav_footer.html")]
fn test_parse_is_deterministic(#[case] name: &str) {
    let html = fixture(name);
    let first = parse(html.as_str(), Some("https://example.com/a/b"), None).unwrap();
    let second = parse(html.as_str(), Some("https://example.com/a/b"), None).unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case("article.html")]
#[case("json_ld.html")]
#[case("rtl.html")]
fn test_rejection_is_monotonic(#[case] name: &str) {
    let html = fixture(name);
    let mut rejected = false;
    for threshold in [0, 100, 250, 500, 800, 1_000, 2_500, 5_000, 100_000] {
        let options = ParseOptions::builder().char_threshold(threshold).build();
        let accepted = parse(html.as_str(), None, Some(options)).unwrap().is_some();
        if rejected {
            assert!(!accepted, "{name} accepted again at threshold {threshold}");
        }
        rejected |= !accepted;
    }
    assert!(rejected, "{name} should be rejected at the largest threshold");
}

#[test]
fn test_not_readerable_can_still_parse() {
    let paragraphs: String = (0..12)
        .map(|i| format!("<p>Short note {i}, with a comma, about the weather today and tomorrow.</p>"))
        .collect();
    let html = format!("<html><body><div>{paragraphs}</div></body></html>");

    assert!(!is_probably_readerable(html.as_str()));
    let article = parse(html.as_str(), None, None).unwrap();
    assert!(article.is_some_and(|a| a.length >= 500));
}

#[rstest]
#[case("article.html", ReaderAvailability::Available)]
#[case("json_ld.html", ReaderAvailability::Available)]
#[case("rtl.html", ReaderAvailability::Available)]
#[case("nav_footer.html", ReaderAvailability::Unavailable)]
fn test_availability(#[case] name: &str, #[case] expected: ReaderAvailability) {
    assert_eq!(check_availability(fixture(name).as_str()), expected);
}

#[test]
fn test_json_contract() {
    let article = parse(fixture("json_ld.html").as_str(), None, None).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&article.to_json().unwrap()).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(object.len(), 10);
    for key in ["title", "content", "textContent", "excerpt"] {
        assert!(object[key].is_string(), "{key} should be a string");
    }
    assert!(object["length"].is_u64());
    assert!(object["language"].is_null());
    assert!(object["direction"].is_null());
    assert_eq!(object["siteName"], "Harbour Times");

    let pretty = article.to_json_pretty().unwrap();
    assert_eq!(Article::from_json(&pretty).unwrap(), article);
}

#[test]
fn test_json_ld_metadata() {
    let article = parse(fixture("json_ld.html").as_str(), None, None).unwrap().unwrap();

    assert_eq!(article.title, "Morning Markets Reopen After Storm");
    assert_eq!(article.byline.as_deref(), Some("Ana Costa, Tom Reed"));
    assert_eq!(
        article.excerpt,
        "Stallholders returned to the quay on Thursday after a week of repairs."
    );
    assert_eq!(article.published_time.as_deref(), Some("2023-11-02T06:00:00+01:00"));
}

#[test]
fn test_json_ld_can_be_disabled() {
    let options = ParseOptions::builder().disable_json_ld(true).build();
    let article = parse(fixture("json_ld.html").as_str(), None, Some(options)).unwrap().unwrap();

    assert_ne!(article.title, "Morning Markets Reopen After Storm");
    assert!(article.byline.is_none());
    assert!(article.site_name.is_none());
    assert!(article.published_time.is_none());
    assert!(article.excerpt.starts_with("The morning market returned to the quay"));
}

#[test]
fn test_rtl_article() {
    let article = parse(fixture("rtl.html").as_str(), None, None).unwrap().unwrap();
    assert_eq!(article.language.as_deref(), Some("ar"));
    assert_eq!(article.direction, Some(TextDirection::Rtl));
    assert_eq!(article.title, "عودة الطيور المهاجرة إلى البحيرة");
}

#[rstest]
#[case("article.html")]
#[case("rtl.html")]
fn test_sanitizing_is_idempotent(#[case] name: &str) {
    let mut doc = Document::parse(&fixture(name)).unwrap();
    preprocess_document(&mut doc, &PreprocessConfig::default());
    let once = doc.to_html();
    preprocess_document(&mut doc, &PreprocessConfig::default());
    assert_eq!(doc.to_html(), once);

    let markup = sanitize_markup(&fixture(name));
    assert_eq!(sanitize_markup(&markup), markup);
}

#[test]
fn test_parsed_document_source() {
    let doc = Document::parse(&fixture("article.html")).unwrap();
    let before = doc.to_html();

    let from_doc = Readability::new().parse(&doc, None).unwrap();
    let from_markup = Readability::new().parse(fixture("article.html").as_str(), None).unwrap();

    assert_eq!(doc.to_html(), before);
    assert_eq!(from_doc, from_markup);
}

#[test]
fn test_keep_classes() {
    let html = format!(r#"<html><body><article class="story">{}</article></body></html>"#, long_paragraphs(6))
        .replace("<p>", r#"<p class="lede">"#);

    let stripped = parse(html.as_str(), None, None).unwrap().unwrap();
    assert!(!stripped.content.contains("lede"));
    assert!(stripped.content.contains(r#"class="page""#));

    let preserved = ParseOptions::builder().classes_to_preserve(vec!["lede".to_string()]).build();
    let article = parse(html.as_str(), None, Some(preserved)).unwrap().unwrap();
    assert!(article.content.contains(r#"class="lede""#));
    assert!(!article.content.contains("story"));

    let kept = ParseOptions::builder().keep_classes(true).build();
    let article = parse(html.as_str(), None, Some(kept)).unwrap().unwrap();
    assert!(article.content.contains("story"));
}

#[test]
fn test_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Document>();
    assert_send_sync::<ParseOptions>();
    assert_send_sync::<Article>();

    let html = fixture("article.html");
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let html = html.clone();
            std::thread::spawn(move || parse(html.as_str(), None, None).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}
