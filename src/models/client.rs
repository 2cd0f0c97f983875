/// A client row from the `client` table.
///
/// `id` is assigned by the database on insert; a freshly built client carries
/// `id == 0` until it is read back. `address` may be absent.
#[derive(sqlx::FromRow, Debug, Clone, Default)]
pub struct Client {
    #[sqlx(rename = "cli_id")]
    pub id: i64,
    #[sqlx(rename = "cli_nom")]
    pub last_name: String,
    #[sqlx(rename = "cli_prenom")]
    pub first_name: String,
    #[sqlx(rename = "cli_adresse")]
    pub address: Option<String>,
    #[sqlx(rename = "cli_ville")]
    pub city: String,
}
