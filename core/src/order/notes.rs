// wcpay_core/src/order/notes.rs

//! Rich-text order notes. The exact text doubles as the content-based idempotency key, so
//! changing any template changes which re-deliveries are recognised as duplicates.

use crate::money::format_price;

/// Renders order notes, linking transactions and disputes to the admin UI when a base URL
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct NoteComposer {
  admin_base_url: Option<String>,
}

impl NoteComposer {
  pub fn new(admin_base_url: Option<String>) -> Self {
    Self { admin_base_url }
  }

  /// `<a>` to the transaction details page, or the charge/intent id in `<code>`.
  pub fn transaction_link(&self, id: &str) -> String {
    match &self.admin_base_url {
      Some(base) if !id.is_empty() => format!(
        "<a href=\"{}/admin.php?page=wc-admin&path=/payments/transactions/details&id={}\">{}</a>",
        base,
        esc_html(id),
        esc_html(id)
      ),
      _ => format!("<code>{}</code>", esc_html(id)),
    }
  }

  pub fn dispute_link(&self, dispute_id: &str) -> String {
    match &self.admin_base_url {
      Some(base) => format!(
        "<a href=\"{}/admin.php?page=wc-admin&path=/payments/disputes/details&id={}\">dispute overview</a>",
        base,
        esc_html(dispute_id)
      ),
      None => format!("dispute overview (<code>{}</code>)", esc_html(dispute_id)),
    }
  }

  pub fn payment_completed(&self, amount: i64, currency: &str, transaction_id: &str) -> String {
    format!(
      "A payment of {} was <strong>successfully charged</strong> using WooCommerce Payments ({}).",
      format_price(amount, currency),
      self.transaction_link(transaction_id)
    )
  }

  pub fn payment_failed(&self, amount: i64, currency: &str, transaction_id: &str, message: Option<&str>) -> String {
    let note = format!(
      "A payment of {} <strong>failed</strong> using WooCommerce Payments ({}).",
      format_price(amount, currency),
      self.transaction_link(transaction_id)
    );
    with_message(note, message)
  }

  pub fn payment_authorized(&self, amount: i64, currency: &str, transaction_id: &str) -> String {
    format!(
      "A payment of {} was <strong>authorized</strong> using WooCommerce Payments ({}).",
      format_price(amount, currency),
      self.transaction_link(transaction_id)
    )
  }

  pub fn payment_started(&self, amount: i64, currency: &str, transaction_id: &str) -> String {
    format!(
      "A payment of {} was <strong>started</strong> using WooCommerce Payments ({}).",
      format_price(amount, currency),
      self.transaction_link(transaction_id)
    )
  }

  pub fn capture_completed(&self, amount: i64, currency: &str, transaction_id: &str) -> String {
    format!(
      "A payment of {} was <strong>successfully captured</strong> using WooCommerce Payments ({}).",
      format_price(amount, currency),
      self.transaction_link(transaction_id)
    )
  }

  pub fn capture_failed(&self, amount: i64, currency: &str, transaction_id: &str, message: Option<&str>) -> String {
    let note = format!(
      "A capture of {} <strong>failed</strong> to complete using WooCommerce Payments ({}).",
      format_price(amount, currency),
      self.transaction_link(transaction_id)
    );
    with_message(note, message)
  }

  pub fn capture_expired(&self, transaction_id: &str) -> String {
    format!(
      "Payment authorization has <strong>expired</strong> ({}).",
      self.transaction_link(transaction_id)
    )
  }

  pub fn capture_cancelled(&self) -> String {
    "Payment authorization was successfully <strong>cancelled</strong>.".to_string()
  }

  pub fn dispute_created(
    &self,
    dispute_id: &str,
    amount: i64,
    currency: &str,
    reason: &str,
    due_by: Option<&str>,
  ) -> String {
    let mut note = format!(
      "Payment has been disputed as {} for {}. See {} for more details.",
      reason.replace('_', " "),
      format_price(amount, currency),
      self.dispute_link(dispute_id)
    );
    if let Some(due_by) = due_by.filter(|d| !d.is_empty()) {
      note.push_str(&format!(" Respond by {}.", esc_html(due_by)));
    }
    note
  }

  pub fn dispute_closed(&self, dispute_id: &str, status: &str) -> String {
    format!(
      "Payment dispute has been closed with status {}. See {} for more details.",
      esc_html(status),
      self.dispute_link(dispute_id)
    )
  }

  pub fn dispute_updated(&self, dispute_id: &str, message: &str) -> String {
    format!("{}. See {} for more details.", message, self.dispute_link(dispute_id))
  }

  pub fn refund_failed(&self, amount: i64, currency: &str, refund_id: &str) -> String {
    format!(
      "A refund of {} was <strong>unsuccessful</strong> using WooCommerce Payments (<code>{}</code>).",
      format_price(amount, currency),
      esc_html(refund_id)
    )
  }
}

fn with_message(mut note: String, message: Option<&str>) -> String {
  if let Some(message) = message.filter(|m| !m.is_empty()) {
    note.push(' ');
    note.push_str(&esc_html(message));
  }
  note
}

pub(crate) fn esc_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for ch in raw.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      _ => out.push(ch),
    }
  }
  out
}
