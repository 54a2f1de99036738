use responder_core::{ConfigError, Post, RunConfig, SCREEN_NAME_PLACEHOLDER};

/// Pick a reply template uniformly at random and render it for `post`.
pub fn select(post: &Post, config: &RunConfig) -> Result<String, ConfigError> {
    select_with(post, config, &mut fastrand::Rng::new())
}

/// Same as [`select`] with a caller-provided generator.
pub fn select_with(
    post: &Post,
    config: &RunConfig,
    rng: &mut fastrand::Rng,
) -> Result<String, ConfigError> {
    if config.reply_templates.is_empty() {
        return Err(ConfigError::MissingField {
            field: "replyWith".to_string(),
        });
    }

    let index = rng.usize(..config.reply_templates.len());
    Ok(render(&config.reply_templates[index], post))
}

/// Replace every `$SCREEN_NAME$` with `@<author>`. Other `$...$` tokens stay as written.
pub fn render(template: &str, post: &Post) -> String {
    template.replace(
        SCREEN_NAME_PLACEHOLDER,
        &format!("@{}", post.author_handle),
    )
}
