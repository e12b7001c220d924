use crate::{
    calendar::TimingExpression,
    models::{DEFAULT_MESSAGE_TEMPLATE, DueItem, ReminderConfig},
};

/// Fills the effective template for `item` with its fields and attributes.
///
/// Fixed placeholders are substituted before attributes, so an attribute never
/// replaces `{title}`, `{due_date}`, `{days_text}`, `{url}` or `{description}`.
/// Unknown placeholders stay in the output as written.
pub fn render_message(
    item: &DueItem,
    config: &ReminderConfig,
    timing: &TimingExpression,
) -> String {
    let template = [item.message_template.as_deref(), Some(config.message_template.as_str())]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .unwrap_or(DEFAULT_MESSAGE_TEMPLATE);

    let due_date = item
        .due
        .with_timezone(&config.timezone)
        .format("%Y-%m-%d")
        .to_string();

    let mut message = template
        .replace("{title}", &item.title)
        .replace("{due_date}", &due_date)
        .replace("{days_text}", &timing.days_text())
        .replace("{url}", &item.url)
        .replace("{description}", &item.description);

    for (name, value) in &item.attributes {
        if value.is_null() {
            continue;
        }
        let placeholder = format!("{{{}}}", name.to_lowercase());
        message = message.replace(&placeholder, &value.to_string());
    }

    message
}
