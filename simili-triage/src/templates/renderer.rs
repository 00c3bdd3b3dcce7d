//! Template renderer.

use crate::templates::TemplateError;
use chrono::{DateTime, Utc};
use handlebars::{
    handlebars_helper, no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext,
};
use serde_json::{json, Value};

const TRANSFER_NOTICE: &str = "🚚 This issue has been automatically transferred to **{{target}}** because it matches our routing rules.

**Matched rule:** {{rule}}

The discussion will continue there. Thanks for your report!
{{#if revert_reaction}}
If this was a mistake, react with {{reaction revert_reaction}} on this comment and the issue will be moved back.
{{/if}}
{{source_marker}}";

const PENDING_TRANSFER_NOTICE: &str = "⏳ This issue will be transferred to **{{target}}** after {{expires_at}}.

**Reason:** {{reason}}

React with {{reaction approve}} to transfer it now, or {{reaction cancel}} to keep it here.

{{metadata}}";

const PENDING_CLOSE_NOTICE: &str = "⏳ This issue looks like a duplicate of {{original_url}} and will be closed after {{expires_at}}.

React with {{reaction approve}} to close it now, or {{reaction cancel}} to keep it open.

{{metadata}}";

const REVERT_MESSAGE: &str =
    "↩️ Reverting transfer. Moving issue back to **{{source}}** based on user request.";

const CANCEL_NOTICE: &str = "✋ The pending {{action}} was cancelled{{#if (eq action \"transfer\")}}; this issue stays here{{/if}}. Thanks for the feedback!";

const CLOSE_NOTICE: &str =
    "🔒 Closing this issue as a duplicate of {{original_url}}. Please follow the discussion there.";

/// Creates a configured Handlebars registry with custom helpers.
///
/// The registry is configured with:
/// - No HTML escaping (comments are markdown and carry HTML markers)
/// - Strict mode (catches missing variables)
/// - `eq` helper for equality comparisons
/// - `reaction` helper turning a reaction name into its emoji
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();

    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs.register_helper("eq", Box::new(eq_helper));
    hbs.register_helper("reaction", Box::new(reaction));

    hbs
}

/// Equality comparison.
///
/// Usage: `{{#if (eq variable "value")}}...{{/if}}`
fn eq_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param1 = h.param(0).and_then(|v| v.value().as_str());
    let param2 = h.param(1).and_then(|v| v.value().as_str());

    let result = match (param1, param2) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    out.write(if result { "true" } else { "" })?;
    Ok(())
}

handlebars_helper!(reaction: |name: str| reaction_emoji(name));

/// Emoji for a GitHub reaction name; unknown names are shown as `:name:`.
#[must_use]
pub fn reaction_emoji(name: &str) -> String {
    let emoji = match name {
        "+1" => "👍",
        "-1" => "👎",
        "laugh" => "😄",
        "confused" => "😕",
        "heart" => "❤️",
        "hooray" => "🎉",
        "rocket" => "🚀",
        "eyes" => "👀",
        other => return format!(":{other}:"),
    };
    emoji.to_string()
}

/// Renders every comment this crate posts.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Creates a new template renderer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlebars: create_handlebars_registry(),
        }
    }

    /// Notice posted right before a transfer.
    ///
    /// # Arguments
    ///
    /// * `target` - Destination `org/repo`
    /// * `rule` - Human-readable description of what matched
    /// * `source_marker` - Embedded transfer-source metadata
    /// * `revert_reaction` - Reaction that moves the issue back, when reverts are on
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_transfer_notice(
        &self,
        target: &str,
        rule: &str,
        source_marker: &str,
        revert_reaction: Option<&str>,
    ) -> Result<String, TemplateError> {
        let data = json!({
            "target": target,
            "rule": rule,
            "source_marker": source_marker,
            "revert_reaction": revert_reaction.unwrap_or(""),
        });
        self.render_template(TRANSFER_NOTICE, &data)
    }

    /// Notice announcing a delayed transfer; carries the pending-action metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_pending_transfer_notice(
        &self,
        target: &str,
        reason: &str,
        expires_at: DateTime<Utc>,
        approve: &str,
        cancel: &str,
        metadata: &str,
    ) -> Result<String, TemplateError> {
        let data = json!({
            "target": target,
            "reason": reason,
            "expires_at": format_time(expires_at),
            "approve": approve,
            "cancel": cancel,
            "metadata": metadata,
        });
        self.render_template(PENDING_TRANSFER_NOTICE, &data)
    }

    /// Notice announcing a delayed close; carries the pending-action metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_pending_close_notice(
        &self,
        original_url: &str,
        expires_at: DateTime<Utc>,
        approve: &str,
        cancel: &str,
        metadata: &str,
    ) -> Result<String, TemplateError> {
        let data = json!({
            "original_url": original_url,
            "expires_at": format_time(expires_at),
            "approve": approve,
            "cancel": cancel,
            "metadata": metadata,
        });
        self.render_template(PENDING_CLOSE_NOTICE, &data)
    }

    /// Revert announcement. Always starts with the revert marker.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_revert_message(&self, source: &str) -> Result<String, TemplateError> {
        self.render_template(REVERT_MESSAGE, &json!({ "source": source }))
    }

    /// Acknowledges a cancelled pending action (`transfer` or `close`).
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_cancel_notice(&self, action: &str) -> Result<String, TemplateError> {
        self.render_template(CANCEL_NOTICE, &json!({ "action": action }))
    }

    /// Comment posted when closing a duplicate.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_close_notice(&self, original_url: &str) -> Result<String, TemplateError> {
        self.render_template(CLOSE_NOTICE, &json!({ "original_url": original_url }))
    }

    fn render_template(&self, template: &str, data: &Value) -> Result<String, TemplateError> {
        Ok(self.handlebars.render_template(template, data)?)
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}
