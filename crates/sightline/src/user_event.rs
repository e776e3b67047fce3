//! Synthetic user interaction against the in-process document.
//!
//! The native locator adapter resolves its element locally and hands it to
//! these functions, which validate the target, update form state and record
//! the DOM events a user agent would fire, in order. The loopback transport
//! reuses them to play remote commands back against a document.

use tracing::trace;

use crate::dom::ElementRef;
use crate::options::FileInput;
use crate::result::{LocatorError, LocatorResult};
use crate::selector::role::label_control;
use crate::transport::Action;

const TEXT_INPUT_TYPES: &[&str] = &[
    "text", "search", "url", "tel", "email", "password", "number", "date", "month", "week",
    "time", "datetime-local", "color",
];

fn action_failed(action: Action, selector: &str, message: impl Into<String>) -> LocatorError {
    LocatorError::ActionFailed {
        action: action.to_string(),
        selector: selector.to_string(),
        message: message.into(),
        container: String::new(),
    }
}

fn invalid_target(action: Action, selector: &str, element: &ElementRef, expected: &str) -> LocatorError {
    LocatorError::InvalidTarget {
        action: action.to_string(),
        selector: selector.to_string(),
        element: element.preview(),
        expected: expected.to_string(),
        container: String::new(),
    }
}

fn fire(element: &ElementRef, kinds: &[&str]) {
    for kind in kinds {
        element.document().record_event(kind, element, None);
    }
}

fn input_type(element: &ElementRef) -> String {
    element
        .attribute("type")
        .map_or_else(|| "text".to_string(), |t| t.to_ascii_lowercase())
}

fn is_focusable(element: &ElementRef) -> bool {
    match element.tag_name().as_str() {
        "input" | "select" | "textarea" | "button" | "iframe" => true,
        "a" | "area" => element.has_attribute("href"),
        _ => element.has_attribute("tabindex") || is_content_editable(element),
    }
}

fn is_content_editable(element: &ElementRef) -> bool {
    element
        .attribute("contenteditable")
        .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
}

fn is_editable(element: &ElementRef) -> bool {
    match element.tag_name().as_str() {
        "textarea" => true,
        "input" => TEXT_INPUT_TYPES.contains(&input_type(element).as_str()),
        _ => is_content_editable(element),
    }
}

fn focus(element: &ElementRef) {
    let document = element.document();
    if document.focused().as_ref() == Some(element) {
        return;
    }
    if let Some(previous) = document.focused() {
        fire(&previous, &["blur", "focusout"]);
    }
    document.set_focused(Some(element));
    fire(element, &["focus", "focusin"]);
}

fn ensure_enabled(action: Action, selector: &str, element: &ElementRef) -> LocatorResult<()> {
    if element.is_disabled() {
        return Err(action_failed(action, selector, "element is disabled"));
    }
    Ok(())
}

/// Default activation behavior of a click
fn activate(element: &ElementRef) {
    match element.tag_name().as_str() {
        "input" => match input_type(element).as_str() {
            "checkbox" => {
                element.set_checked(!element.checked());
                fire(element, &["input", "change"]);
            }
            "radio" if !element.checked() => {
                uncheck_radio_group(element);
                element.set_checked(true);
                fire(element, &["input", "change"]);
            }
            _ => {}
        },
        "label" => {
            if let Some(control) = label_control(element) {
                if !control.is_disabled() {
                    fire(&control, &["click"]);
                    if is_focusable(&control) {
                        focus(&control);
                    }
                    activate(&control);
                }
            }
        }
        _ => {}
    }
}

fn uncheck_radio_group(radio: &ElementRef) {
    let Some(name) = radio.attribute("name") else {
        return;
    };
    let root = radio.document().document_element();
    for other in root.descendants() {
        if other != *radio
            && other.tag_name() == "input"
            && input_type(&other) == "radio"
            && other.attribute("name").as_deref() == Some(name.as_str())
        {
            other.set_checked(false);
        }
    }
}

/// Press and release the primary button `count` times.
///
/// `count` is 1 for click, 2 for double-click and 3 for triple-click.
pub fn click(element: &ElementRef, selector: &str, count: u32) -> LocatorResult<()> {
    let action = match count {
        2 => Action::DblClick,
        3 => Action::TripleClick,
        _ => Action::Click,
    };
    ensure_enabled(action, selector, element)?;
    trace!(selector, count, "native click");

    hover_into(element);
    for detail in 1..=count.max(1) {
        fire(element, &["pointerdown", "mousedown"]);
        if detail == 1 && is_focusable(element) {
            focus(element);
        }
        fire(element, &["pointerup", "mouseup"]);
        element
            .document()
            .record_event("click", element, Some(detail.to_string()));
        activate(element);
        if detail == 2 {
            fire(element, &["dblclick"]);
        }
    }
    Ok(())
}

fn hover_into(element: &ElementRef) {
    let document = element.document();
    match document.hovered() {
        Some(current) if current == *element => return,
        Some(current) => leave(&current),
        None => {}
    }
    fire(
        element,
        &["pointerover", "pointerenter", "mouseover", "mouseenter", "pointermove", "mousemove"],
    );
    document.set_hovered(Some(element));
}

fn leave(element: &ElementRef) {
    fire(element, &["pointermove", "mousemove", "pointerout", "pointerleave", "mouseout", "mouseleave"]);
    element.document().set_hovered(None);
}

/// Move the pointer over the element
pub fn hover(element: &ElementRef, selector: &str) -> LocatorResult<()> {
    trace!(selector, "native hover");
    hover_into(element);
    Ok(())
}

/// Move the pointer away from the element
pub fn unhover(element: &ElementRef, selector: &str) -> LocatorResult<()> {
    trace!(selector, "native unhover");
    let document = element.document();
    if document.hovered().as_ref() == Some(element) {
        leave(element);
    } else {
        fire(element, &["pointerout", "pointerleave", "mouseout", "mouseleave"]);
    }
    Ok(())
}

fn write_text(element: &ElementRef, action: Action, selector: &str, text: &str) -> LocatorResult<()> {
    if !is_editable(element) {
        return Err(invalid_target(
            action,
            selector,
            element,
            "an <input>, <textarea> or [contenteditable] element",
        ));
    }
    ensure_enabled(action, selector, element)?;
    if element.has_attribute("readonly") {
        return Err(action_failed(action, selector, "element is readonly"));
    }

    focus(element);
    if is_content_editable(element) {
        element.set_inner_html(&escape_text(text))?;
    } else {
        element.set_value(text);
    }
    element
        .document()
        .record_event("input", element, Some(text.to_string()));
    fire(element, &["change"]);
    Ok(())
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Replace the value of an editable element
pub fn fill(element: &ElementRef, selector: &str, text: &str) -> LocatorResult<()> {
    trace!(selector, len = text.len(), "native fill");
    write_text(element, Action::Fill, selector, text)
}

/// Empty the value of an editable element
pub fn clear(element: &ElementRef, selector: &str) -> LocatorResult<()> {
    trace!(selector, "native clear");
    write_text(element, Action::Clear, selector, "")
}

/// Assign files to an `<input type="file">`
pub fn upload(element: &ElementRef, selector: &str, files: &[FileInput]) -> LocatorResult<()> {
    if element.tag_name() != "input" || input_type(element) != "file" {
        return Err(invalid_target(
            Action::Upload,
            selector,
            element,
            "an <input type=\"file\"> element",
        ));
    }
    ensure_enabled(Action::Upload, selector, element)?;
    if files.len() > 1 && !element.has_attribute("multiple") {
        return Err(action_failed(
            Action::Upload,
            selector,
            format!("input accepts a single file, got {}", files.len()),
        ));
    }

    trace!(selector, files = files.len(), "native upload");
    element.set_files(files.iter().map(FileInput::name).collect());
    fire(element, &["input", "change"]);
    Ok(())
}

/// Select the given `<option>` elements of a `<select>`.
///
/// Choosing more than one option of a single-value select, or a disabled
/// option, fails with [`LocatorError::ActionFailed`]. A `multiple` select
/// replaces its selection with exactly `chosen`.
pub fn select_options(select: &ElementRef, selector: &str, chosen: &[ElementRef]) -> LocatorResult<()> {
    if select.tag_name() != "select" {
        return Err(invalid_target(
            Action::SelectOptions,
            selector,
            select,
            "a <select> element",
        ));
    }
    ensure_enabled(Action::SelectOptions, selector, select)?;
    let multiple = select.has_attribute("multiple");
    if chosen.len() > 1 && !multiple {
        return Err(action_failed(
            Action::SelectOptions,
            selector,
            "cannot select multiple options on a single-value <select>",
        ));
    }
    if let Some(disabled) = chosen.iter().find(|o| o.is_disabled()) {
        return Err(action_failed(
            Action::SelectOptions,
            selector,
            format!("option {} is disabled", disabled.preview()),
        ));
    }

    trace!(selector, options = chosen.len(), "native selectOptions");
    focus(select);
    for option in select.options() {
        option.set_selected(chosen.contains(&option));
    }
    select
        .document()
        .record_event("input", select, Some(select.value()));
    fire(select, &["change"]);
    Ok(())
}

/// Drag `source` and drop it onto `target`
pub fn drag_and_drop(
    source: &ElementRef,
    source_selector: &str,
    target: &ElementRef,
    target_selector: &str,
) -> LocatorResult<()> {
    trace!(source = source_selector, target = target_selector, "native dragAndDrop");
    hover_into(source);
    fire(source, &["pointerdown", "mousedown", "dragstart", "drag"]);
    hover_into(target);
    fire(target, &["dragenter", "dragover", "drop"]);
    fire(source, &["dragend"]);
    fire(target, &["pointerup", "mouseup"]);
    Ok(())
}
