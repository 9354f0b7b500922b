use axum::{http::header, response::IntoResponse};

/// Wires the admin tables' delete buttons to their `DELETE` endpoints.
const ADMIN_JS: &str = r#"document.addEventListener("click", async (event) => {
  const button = event.target.closest("[data-delete-url]");
  if (!button || !confirm("Delete this entry?")) return;
  const response = await fetch(button.dataset.deleteUrl, {
    method: "DELETE",
    credentials: "same-origin",
  });
  const body = await response.json().catch(() => ({}));
  if (response.ok) {
    button.closest("tr").remove();
  } else {
    alert(body.error || "Delete failed");
  }
});
"#;

/// `GET /assets/admin.js`
pub async fn admin_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        ADMIN_JS,
    )
}
