//! End-to-end actions for every provider.
//!
//! Remote providers are wired to a [`LoopbackTransport`] over the same
//! document, so every action ends up mutating the page no matter which
//! backend dispatched it.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use sightline::{
    Action, ActionOptions, ClickOptions, Document, DragAndDropOptions, ErrorKind, FileInput,
    LocatorConfig, LocatorFactory, LoopbackTransport, Page, Provider, RecordingTransport,
    RemoteFailure, RoleOptions, TextOptions,
};

const PROVIDERS: [Provider; 3] = [
    Provider::RemoteDriver,
    Provider::Native,
    Provider::RemoteSession,
];

const FORM: &str = r#"
<form>
  <label for="email">Email</label>
  <input id="email" type="email">
  <select id="color" data-testid="color">
    <option value="">Pick one</option>
    <option value="red">Red</option>
    <option value="green">Green</option>
  </select>
  <input id="agree" type="checkbox" aria-label="I agree">
  <input id="avatar" type="file">
  <button type="button">Submit</button>
</form>
<div id="source" draggable="true">drag me</div>
<div id="target">drop here</div>
"#;

fn page(provider: Provider) -> Page {
    let document = Document::with_body(FORM).unwrap();
    let page = Page::new(
        document.clone(),
        LocatorConfig::new().with_provider(provider),
    );
    if provider.is_remote() {
        page.with_transport(Arc::new(LoopbackTransport::new(document)))
    } else {
        page
    }
}

// ============================================================================
// Form interactions
// ============================================================================

#[tokio::test]
async fn test_select_options_sets_value() {
    for provider in PROVIDERS {
        let page = page(provider);
        let select = page.get_by_test_id("color".into());
        select
            .select_options(vec!["red".into()], ActionOptions::new())
            .await
            .unwrap();
        assert_eq!(select.element().unwrap().value(), "red", "{provider}");
    }
}

#[tokio::test]
async fn test_select_options_by_label_and_element() {
    for provider in PROVIDERS {
        let page = page(provider);
        let select = page.locator("#color");
        select
            .select_options(vec!["Green".into()], ActionOptions::new())
            .await
            .unwrap();
        assert_eq!(select.element().unwrap().value(), "green", "{provider}");

        let red = page.locator("#color > option[value=\"red\"]").element().unwrap();
        select
            .select_options(vec![red.into()], ActionOptions::new())
            .await
            .unwrap();
        assert_eq!(select.element().unwrap().value(), "red", "{provider}");
    }
}

#[tokio::test]
async fn test_fill_and_clear() {
    for provider in PROVIDERS {
        let page = page(provider);
        let email = page.get_by_label_text("Email".into(), TextOptions::default());
        email.fill("ada@example.com", ActionOptions::new()).await.unwrap();
        assert_eq!(email.element().unwrap().value(), "ada@example.com", "{provider}");

        email.clear(ActionOptions::new()).await.unwrap();
        assert_eq!(email.element().unwrap().value(), "", "{provider}");
    }
}

#[tokio::test]
async fn test_click_toggles_checkbox() {
    for provider in PROVIDERS {
        let page = page(provider);
        let agree = page.get_by_role("checkbox", &RoleOptions::new().with_name("I agree"));
        agree.click(ClickOptions::new()).await.unwrap();
        assert!(agree.element().unwrap().checked(), "{provider}");
        agree.click(ClickOptions::new()).await.unwrap();
        assert!(!agree.element().unwrap().checked(), "{provider}");
    }
}

#[tokio::test]
async fn test_upload_records_file_names() {
    for provider in PROVIDERS {
        let page = page(provider);
        let avatar = page.locator("#avatar");
        avatar
            .upload(
                vec![FileInput::contents("me.png", "image/png", vec![0x89, 0x50])],
                ActionOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(avatar.element().unwrap().files(), vec!["me.png"], "{provider}");
    }
}

// ============================================================================
// Drag and drop
// ============================================================================

#[tokio::test]
async fn test_drop_to_fires_drag_sequence() {
    for provider in PROVIDERS {
        let page = page(provider);
        page.locator("#source")
            .drop_to(page.locator("#target").as_ref(), DragAndDropOptions::new())
            .await
            .unwrap();
        let kinds: Vec<String> = page
            .document()
            .events()
            .into_iter()
            .filter(|e| e.kind.starts_with("drag") || e.kind == "drop")
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, ["dragstart", "drop", "dragend"], "{provider}");
    }
}

#[tokio::test]
async fn test_drop_to_with_nothing_resolving() {
    for provider in PROVIDERS {
        let document = Document::with_body("<p>empty</p>").unwrap();
        let transport = Arc::new(RecordingTransport::new());
        let page = Page::new(document, LocatorConfig::new().with_provider(provider))
            .with_transport(transport.clone());

        let err = page
            .locator("#source")
            .drop_to(page.locator("#target").as_ref(), DragAndDropOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ElementNotFound, "{provider}");
        assert!(transport.history().is_empty(), "{provider}");
        assert!(page.document().events().is_empty(), "{provider}");
    }
}

// ============================================================================
// Remote dispatch failures
// ============================================================================

#[tokio::test]
async fn test_remote_rejection_surfaces_as_action_failed() {
    for provider in [Provider::RemoteDriver, Provider::RemoteSession] {
        let document = Document::with_body(FORM).unwrap();
        let transport = Arc::new(
            RecordingTransport::new()
                .fail_on(Action::Click, RemoteFailure::Rejected("element is detached".into())),
        );
        let page = Page::new(document, LocatorConfig::new().with_provider(provider))
            .with_transport(transport.clone());

        let err = page
            .get_by_role("button", &RoleOptions::new().with_name("Submit"))
            .click(ClickOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActionFailed, "{provider}");
        assert!(err.to_string().contains("element is detached"));
        assert!(err.to_string().contains("<body"));
        assert!(transport.was_called("click"));
    }
}

#[tokio::test]
async fn test_remote_driver_times_out() {
    let document = Document::with_body(FORM).unwrap();
    let transport =
        Arc::new(RecordingTransport::new().with_delay(Duration::from_millis(200)));
    let config = LocatorConfig::new()
        .with_provider(Provider::RemoteDriver)
        .with_action_timeout(Duration::from_millis(10));
    let page = Page::new(document, config).with_transport(transport);

    let err = page
        .locator("button")
        .click(ClickOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains("<body"));
}

#[tokio::test]
async fn test_remote_session_rejects_multiple_values() {
    let page = page(Provider::RemoteSession);
    let err = page
        .locator("#color")
        .select_options(vec!["red".into(), "green".into()], ActionOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert!(err.to_string().contains("remote-session"));
    assert!(err.to_string().contains("<body"));
    assert_eq!(page.locator("#color").element().unwrap().value(), "");
}
