use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// What phases 2, 4, 5, and 6 need from an upstream repo host. Kept narrow
/// and file/branch/PR-shaped so a different provider (GitLab, a local git
/// remote) can implement it without the planner caring.
#[async_trait]
pub trait RepoProvider: Send + Sync {
    async fn read_file(&self, project: &str, path: &str) -> Result<String, String>;
    async fn default_branch(&self, project: &str) -> Result<String, String>;
    async fn create_branch(&self, project: &str, base: &str, branch: &str) -> Result<(), String>;
    async fn commit_files(
        &self,
        project: &str,
        branch: &str,
        files: &[(String, String)],
        message: &str,
    ) -> Result<String, String>;
    async fn open_pr(
        &self,
        project: &str,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, String>;
    /// Best-effort rollback for a branch created by `create_branch`.
    async fn delete_branch(&self, project: &str, branch: &str) -> Result<(), String>;
}

/// GitHub-flavored implementation, talking to the REST API directly over
/// `reqwest` (no GitHub client crate in the stack; `reqwest` is already the
/// HTTP client of choice elsewhere, see `anthropic.rs`).
pub struct GithubRepoProvider {
    client: Client,
    token: String,
}

impl GithubRepoProvider {
    pub fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }

    fn api(&self, path: &str) -> String {
        format!("https://api.github.com{path}")
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "steward-planner")
            .header("Accept", "application/vnd.github+json")
    }
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Deserialize)]
struct ContentFile {
    content: String,
    sha: String,
}

#[derive(Deserialize)]
struct RefInfo {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct PrResponse {
    html_url: String,
}

#[async_trait]
impl RepoProvider for GithubRepoProvider {
    async fn read_file(&self, project: &str, path: &str) -> Result<String, String> {
        let url = self.api(&format!("/repos/{project}/contents/{path}"));
        let resp = self
            .auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("github read_file {path}: {}", resp.status()));
        }
        let file: ContentFile = resp.json().await.map_err(|e| e.to_string())?;
        let bytes = base64_decode(&file.content.replace('\n', ""))?;
        String::from_utf8(bytes).map_err(|e| e.to_string())
    }

    async fn default_branch(&self, project: &str) -> Result<String, String> {
        let url = self.api(&format!("/repos/{project}"));
        let resp = self
            .auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("github default_branch: {}", resp.status()));
        }
        let info: RepoInfo = resp.json().await.map_err(|e| e.to_string())?;
        Ok(info.default_branch)
    }

    async fn create_branch(&self, project: &str, base: &str, branch: &str) -> Result<(), String> {
        let ref_url = self.api(&format!("/repos/{project}/git/ref/heads/{base}"));
        let resp = self
            .auth(self.client.get(&ref_url))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("github lookup base ref: {}", resp.status()));
        }
        let base_ref: RefInfo = resp.json().await.map_err(|e| e.to_string())?;

        let create_url = self.api(&format!("/repos/{project}/git/refs"));
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": base_ref.object.sha });
        let resp = self
            .auth(self.client.post(&create_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("github create_branch: {}", resp.status()));
        }
        Ok(())
    }

    async fn commit_files(
        &self,
        project: &str,
        branch: &str,
        files: &[(String, String)],
        message: &str,
    ) -> Result<String, String> {
        // One commit per push: write each file via the contents API, letting
        // GitHub create individual commits on the branch, then report the
        // branch head as the resulting "commit". A tree-based atomic commit
        // would be preferable but needs the git-database API end to end;
        // this keeps phase 5 to the same contents API phase 2 already reads.
        for (path, content) in files {
            let url = self.api(&format!("/repos/{project}/contents/{path}"));

            // An existing file must be updated with its current `sha`; a new
            // file omits it. A 404 on the lookup means "doesn't exist yet".
            let existing_sha = match self
                .auth(self.client.get(&url).query(&[("ref", branch)]))
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    resp.json::<ContentFile>().await.ok().map(|f| f.sha)
                }
                _ => None,
            };

            let mut body = json!({
                "message": message,
                "content": base64_encode(content.as_bytes()),
                "branch": branch,
            });
            if let Some(sha) = existing_sha {
                body["sha"] = json!(sha);
            }
            let resp = self
                .auth(self.client.put(&url))
                .json(&body)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            if !resp.status().is_success() {
                return Err(format!("github commit_files {path}: {}", resp.status()));
            }
        }
        Ok(branch.to_string())
    }

    async fn open_pr(
        &self,
        project: &str,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, String> {
        let url = self.api(&format!("/repos/{project}/pulls"));
        let payload = json!({ "title": title, "head": branch, "base": base, "body": body });
        let resp = self
            .auth(self.client.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("github open_pr: {}", resp.status()));
        }
        let pr: PrResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(pr.html_url)
    }

    async fn delete_branch(&self, project: &str, branch: &str) -> Result<(), String> {
        let url = self.api(&format!("/repos/{project}/git/refs/heads/{branch}"));
        let resp = self
            .auth(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(format!("github delete_branch: {}", resp.status()));
        }
        Ok(())
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(b2 & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

fn base64_decode(s: &str) -> Result<Vec<u8>, String> {
    fn val(c: u8) -> Option<u8> {
        match c {
            b'A'..=b'Z' => Some(c - b'A'),
            b'a'..=b'z' => Some(c - b'a' + 26),
            b'0'..=b'9' => Some(c - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }
    let clean: Vec<u8> = s.bytes().filter(|&b| b != b'=').collect();
    let mut out = Vec::with_capacity(clean.len() / 4 * 3);
    for chunk in clean.chunks(4) {
        let vals: Vec<u8> = chunk
            .iter()
            .map(|&b| val(b).ok_or_else(|| "invalid base64".to_string()))
            .collect::<Result<_, _>>()?;
        let n = vals.len();
        let v0 = vals[0];
        let v1 = *vals.get(1).unwrap_or(&0);
        out.push((v0 << 2) | (v1 >> 4));
        if n > 2 {
            let v2 = vals[2];
            out.push((v1 << 4) | (v2 >> 2));
        }
        if n > 3 {
            let v2 = vals[2];
            let v3 = vals[3];
            out.push((v2 << 6) | v3);
        }
    }
    Ok(out)
}
