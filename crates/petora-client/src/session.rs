/// The signed-in user, as handed over by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), display_name: display_name.into(), photo_url: None }
    }

    /// Profile photo, or a generated initials avatar.
    pub fn avatar(&self) -> String {
        match &self.photo_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://api.dicebear.com/7.x/initials/svg?seed={}", self.display_name),
        }
    }

    pub fn initial(&self) -> char {
        self.display_name.chars().next().unwrap_or('?')
    }
}
