//! URL rewriting between the remote demo-webs endpoint and the local host
//! context an agent is handed, preventing an agent from leaking requests
//! across task/context boundaries.

use bench_types::Action;

#[derive(Debug, Clone)]
pub struct UrlRewriter {
    pub remote_origin: String,
    pub local_origin: String,
}

impl UrlRewriter {
    pub fn new(remote_origin: impl Into<String>, local_origin: impl Into<String>) -> Self {
        Self {
            remote_origin: remote_origin.into(),
            local_origin: local_origin.into(),
        }
    }

    /// Rewrite a URL the agent will drive: remote -> local.
    pub fn to_local(&self, url: &str) -> String {
        if url.starts_with(&self.remote_origin) {
            format!("{}{}", self.local_origin, &url[self.remote_origin.len()..])
        } else {
            url.to_string()
        }
    }

    /// Rewrite a URL returned by the agent back to the remote endpoint:
    /// local -> remote.
    pub fn to_remote(&self, url: &str) -> String {
        if url.starts_with(&self.local_origin) {
            format!("{}{}", self.remote_origin, &url[self.local_origin.len()..])
        } else {
            url.to_string()
        }
    }

    /// Rewrite every `Navigate` action's URL back to the remote endpoint.
    /// Other action kinds are passed through unchanged.
    pub fn rewrite_actions_to_remote(&self, actions: Vec<Action>) -> Vec<Action> {
        actions
            .into_iter()
            .map(|a| match a {
                Action::Navigate { url } => Action::Navigate {
                    url: self.to_remote(&url),
                },
                other => other,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_origin() {
        let rw = UrlRewriter::new("https://demo.example", "http://127.0.0.1:9000");
        let local = rw.to_local("https://demo.example/checkout");
        assert_eq!(local, "http://127.0.0.1:9000/checkout");
        let remote = rw.to_remote(&local);
        assert_eq!(remote, "https://demo.example/checkout");
    }

    #[test]
    fn leaves_unrelated_urls_untouched() {
        let rw = UrlRewriter::new("https://demo.example", "http://127.0.0.1:9000");
        assert_eq!(rw.to_local("https://other.example/x"), "https://other.example/x");
    }
}
