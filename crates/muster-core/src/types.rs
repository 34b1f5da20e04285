/// Mutation scope for events that belong to a recurring series.
///
/// Mutations without a scope target a standalone event; recurring mutations
/// default to [`Scope::EntireSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    ThisInstanceOnly,
    EntireSeries,
}

impl Scope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThisInstanceOnly => "THIS_INSTANCE_ONLY",
            Self::EntireSeries => "ENTIRE_SERIES",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
