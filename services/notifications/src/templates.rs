//! HTML email templates with an optional call-to-action URL (spec §4.L).

use carbonledger_core::entities::NotificationKind;

pub fn render(kind: NotificationKind, title: &str, body: &str, action_url: Option<&str>) -> String {
    let cta = action_url
        .map(|url| {
            format!(
                r#"<p><a href="{url}" style="display:inline-block;padding:10px 18px;background:#1a7f4b;color:#fff;text-decoration:none;border-radius:4px;">View details</a></p>"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family:sans-serif;color:#222;">
  <h2>{title}</h2>
  <p>{body}</p>
  {cta}
  <hr>
  <p style="color:#888;font-size:12px;">carbonledger &middot; {kind}</p>
</body>
</html>"#,
        kind = kind_label(kind),
    )
}

fn kind_label(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::InvoiceProcessed => "invoice processed",
        NotificationKind::ReportReady => "report ready",
        NotificationKind::Anomaly => "anomaly detected",
        NotificationKind::SupplierInvite => "supplier invitation",
        NotificationKind::General => "notification",
    }
}
