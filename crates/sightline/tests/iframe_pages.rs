//! Frame pages across every provider.
//!
//! Each scenario runs once per backend: frame-page resolution must not
//! depend on how actions are dispatched.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sightline::{
    Document, ErrorKind, FrameContent, LocatorConfig, LocatorFactory, Page, Provider,
    RoleOptions, TextOptions,
};

const PROVIDERS: [Provider; 3] = [
    Provider::RemoteDriver,
    Provider::Native,
    Provider::RemoteSession,
];

/// A page whose body holds `outer`, with the first iframe's body set to `inner`
fn page_with_frame(provider: Provider, outer: &str, inner: &str) -> Page {
    let document = Document::with_body(outer).unwrap();
    let iframe = document
        .body()
        .descendants()
        .into_iter()
        .find(|e| e.is_iframe())
        .expect("fixture has an iframe");
    iframe
        .content_document()
        .expect("same-origin iframe")
        .body()
        .set_inner_html(inner)
        .unwrap();
    Page::new(document, LocatorConfig::new().with_provider(provider))
}

// ============================================================================
// Frame page from an iframe element
// ============================================================================

#[test]
fn test_frame_page_from_iframe_element() {
    for provider in PROVIDERS {
        let page = page_with_frame(
            provider,
            r#"<div><iframe id="test-iframe" style="width: 300px; height: 300px;"></iframe></div>"#,
            r#"<div>
                 <button data-testid="iframe-button">Click me</button>
                 <p>This is text inside the iframe</p>
               </div>"#,
        );
        let iframe = page.document().get_element_by_id("test-iframe").unwrap();
        let frame = page.create_frame_page(&iframe).unwrap();

        let button = frame.get_by_test_id("iframe-button".into()).element().unwrap();
        assert_eq!(button.text_content().trim(), "Click me", "{provider}");

        let text = frame
            .get_by_text("This is text inside the iframe".into(), TextOptions::default())
            .element()
            .unwrap();
        assert_eq!(text.text_content().trim(), "This is text inside the iframe");

        let partial = frame
            .get_by_text("inside the iframe".into(), TextOptions::default())
            .element()
            .unwrap();
        assert!(partial.text_content().contains("inside the iframe"));
    }
}

#[test]
fn test_frame_page_from_locator() {
    for provider in PROVIDERS {
        let page = page_with_frame(
            provider,
            r#"<div><iframe data-testid="test-iframe"></iframe></div>"#,
            r#"<div>
                 <button>A button in iframe</button>
                 <p>Text inside iframe from locator</p>
               </div>"#,
        );
        let iframe_locator = page.get_by_test_id("test-iframe".into());
        let frame = page.create_frame_page(&iframe_locator).unwrap();

        let button = frame
            .get_by_role(
                "button",
                &RoleOptions::new().with_name("A button in iframe"),
            )
            .element()
            .unwrap();
        assert_eq!(button.text_content().trim(), "A button in iframe", "{provider}");

        let text = frame
            .get_by_text("Text inside iframe from locator".into(), TextOptions::default())
            .element()
            .unwrap();
        assert_eq!(text.text_content().trim(), "Text inside iframe from locator");
    }
}

#[test]
fn test_non_iframe_is_rejected() {
    for provider in PROVIDERS {
        let document = Document::with_body(
            r#"<div id="not-an-iframe"><button>Not an iframe</button></div>"#,
        )
        .unwrap();
        let page = Page::new(document, LocatorConfig::new().with_provider(provider));
        let not_iframe = page.document().get_element_by_id("not-an-iframe").unwrap();

        let err = page.create_frame_page(&not_iframe).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch, "{provider}");
        assert!(err
            .to_string()
            .contains("Expected frameElement to be an iframe element"));
    }
}

#[test]
fn test_locator_methods_within_frame_page() {
    for provider in PROVIDERS {
        let page = page_with_frame(
            provider,
            r#"<div><iframe id="test-iframe"></iframe></div>"#,
            r#"<div>
                 <label for="test-input">Input Label</label>
                 <input id="test-input" placeholder="Test placeholder" />
                 <img alt="Test image" src="" />
                 <div title="Test title">Title element</div>
                 <button role="button" aria-label="Special button">Button text</button>
               </div>"#,
        );
        let iframe = page.document().get_element_by_id("test-iframe").unwrap();
        let frame = page.create_frame_page(iframe).unwrap();

        let label = frame
            .get_by_label_text("Input Label".into(), TextOptions::default())
            .element()
            .unwrap();
        assert_eq!(label.attribute("id").as_deref(), Some("test-input"), "{provider}");

        let placeholder = frame
            .get_by_placeholder("Test placeholder".into(), TextOptions::default())
            .element()
            .unwrap();
        assert_eq!(placeholder.attribute("placeholder").as_deref(), Some("Test placeholder"));

        let alt = frame
            .get_by_alt_text("Test image".into(), TextOptions::default())
            .element()
            .unwrap();
        assert_eq!(alt.attribute("alt").as_deref(), Some("Test image"));

        let title = frame
            .get_by_title("Test title".into(), TextOptions::default())
            .element()
            .unwrap();
        assert_eq!(title.attribute("title").as_deref(), Some("Test title"));

        let role = frame
            .get_by_role("button", &RoleOptions::new().with_name("Special button"))
            .element()
            .unwrap();
        assert_eq!(role.attribute("aria-label").as_deref(), Some("Special button"));
    }
}

// ============================================================================
// Scoping
// ============================================================================

#[test]
fn test_test_id_resolves_only_inside_frame() {
    for provider in PROVIDERS {
        let page = page_with_frame(
            provider,
            r#"<button data-testid="twin">top</button><iframe></iframe>"#,
            r#"<button data-testid="twin">framed</button>"#,
        );
        let frame = page.create_frame_page(page.locator("iframe").as_ref()).unwrap();

        let framed = frame.get_by_test_id("twin".into()).elements();
        assert_eq!(framed.len(), 1, "{provider}");
        assert_eq!(framed[0].text_content(), "framed");
        assert!(framed[0].document().ptr_eq(frame.document()));

        let top = page.get_by_test_id("twin".into()).element().unwrap();
        assert_eq!(top.text_content(), "top");
    }
}

#[test]
fn test_missing_element_in_frame_reports_selector() {
    for provider in PROVIDERS {
        let page = page_with_frame(provider, "<iframe></iframe>", "<p>empty</p>");
        let frame = page.create_frame_page(page.locator("iframe").as_ref()).unwrap();
        let err = frame.get_by_test_id("ghost".into()).element().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ElementNotFound, "{provider}");
        assert!(err.to_string().contains(r#"internal:testid=[data-testid="ghost"s]"#));
        assert!(err.to_string().contains("empty"));
    }
}

#[test]
fn test_cross_origin_frame_is_access_denied() {
    for provider in PROVIDERS {
        let document = Document::with_body("<iframe></iframe>").unwrap();
        let page = Page::new(document, LocatorConfig::new().with_provider(provider));
        let iframe = page.locator("iframe").element().unwrap();
        iframe.set_frame_content(FrameContent::CrossOrigin);
        let err = page.create_frame_page(iframe).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied, "{provider}");
    }
}

#[test]
fn test_frame_page_is_stale_after_navigation() {
    let page = page_with_frame(Provider::Native, "<iframe></iframe>", "<p>first</p>");
    let frame = page.create_frame_page(page.locator("iframe").as_ref()).unwrap();
    assert!(!frame.is_stale());

    frame.iframe().navigate_frame("<p>second</p>").unwrap();
    assert!(frame.is_stale());

    let fresh = page.create_frame_page(page.locator("iframe").as_ref()).unwrap();
    assert!(!fresh.is_stale());
    let text = fresh.locator("p").element().unwrap();
    assert_eq!(text.text_content(), "second");
}
