//! Resolving `select_options` targets against live `<option>` elements.
//!
//! A text target matches an option's value first and its label second,
//! where the label is the trimmed text content or the `aria-label`. Element
//! and locator targets match by identity.

use crate::config::Provider;
use crate::dom::ElementRef;
use crate::result::{LocatorError, LocatorResult};

use super::{LocatorCore, SelectTarget};

fn label_matches(option: &ElementRef, text: &str) -> bool {
    option.text_content().trim() == text
        || option.attribute("aria-label").as_deref() == Some(text)
}

/// Index of the option `target` designates, or the text used in the
/// not-found diagnostic
fn find_index(options: &[ElementRef], target: &SelectTarget) -> LocatorResult<Result<usize, String>> {
    let found = match target {
        SelectTarget::Text(text) => options
            .iter()
            .position(|o| o.value() == *text)
            .or_else(|| options.iter().position(|o| label_matches(o, text)))
            .ok_or_else(|| format!("option \"{text}\"")),
        SelectTarget::Element(element) => options
            .iter()
            .position(|o| o == element)
            .ok_or_else(|| format!("element {}", element.preview())),
        SelectTarget::Locator(locator) => {
            let element = locator.element()?;
            options
                .iter()
                .position(|o| *o == element)
                .ok_or_else(|| format!("element {}", element.preview()))
        }
    };
    Ok(found)
}

fn option_not_found(core: &LocatorCore, option: String) -> LocatorError {
    LocatorError::OptionNotFound {
        option,
        selector: core.selector().to_string(),
        container: core.container_description(),
    }
}

/// Option elements for every target, in target order
pub(crate) fn resolve_options(
    core: &LocatorCore,
    select: &ElementRef,
    targets: &[SelectTarget],
) -> LocatorResult<Vec<ElementRef>> {
    let options = select.options();
    targets
        .iter()
        .map(|target| match find_index(&options, target)? {
            Ok(index) => Ok(options[index].clone()),
            Err(option) => Err(option_not_found(core, option)),
        })
        .collect()
}

/// Positional index for a backend that selects one option by index only.
///
/// No targets yields no indexes; more than one target is unsupported.
pub(crate) fn resolve_index(
    core: &LocatorCore,
    provider: Provider,
    select: &ElementRef,
    targets: &[SelectTarget],
) -> LocatorResult<Vec<usize>> {
    let target = match targets {
        [] => return Ok(Vec::new()),
        [target] => target,
        _ => {
            return Err(LocatorError::UnsupportedOperation {
                provider: provider.name().to_string(),
                operation: "selecting multiple values at once".to_string(),
                selector: core.selector().to_string(),
                container: core.container_description(),
            })
        }
    };
    match find_index(&select.options(), target)? {
        Ok(index) => Ok(vec![index]),
        Err(option) => Err(option_not_found(core, option)),
    }
}
