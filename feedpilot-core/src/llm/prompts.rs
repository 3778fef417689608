use super::SKIP_SENTINEL;

pub fn comment_prompt(voice_directive: &str, author: &str, content: &str) -> String {
    format!(
        "You help a professional engage with their network. Write a short, genuine comment \
that reads like a person wrote it, for the post below.\n\
Write in the user's own voice and tone:\n\
--- USER VOICE ---\n\
{voice_directive}\n\
--- END USER VOICE ---\n\
Rules:\n\
- If the post carries no real insight (job announcements, work anniversaries, \
generic celebrations), reply with exactly {SKIP_SENTINEL} and nothing else.\n\
- Otherwise reply with 2-3 sentences.\n\
- No greeting and no sign-off.\n\
\n\
--- POST ---\n\
Author: {author}\n\
Content: {content}"
    )
}

pub fn summary_prompt(contents: &str) -> String {
    format!(
        "You are an analyst. Below are the posts from the user's feed today.\n\
Write a concise daily summary of what their network talked about: the top 3-4 \
themes, as bullet points.\n\
\n\
--- POSTS ---\n\
{contents}"
    )
}
