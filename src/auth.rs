use std::fmt;

/// Azure DevOps connection details.
///
/// Built once at startup and handed to the API client. Fields are never
/// validated here: a missing value is simply an empty string.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    base_url: String,
    organization: String,
    project: String,
    access_token: String,
}

impl Credential {
    pub fn new(
        base_url: impl Into<String>,
        organization: impl Into<String>,
        project: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            organization: organization.into(),
            project: project.into(),
            access_token: access_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Personal access token, sent as the password half of basic auth.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
