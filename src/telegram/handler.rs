use std::sync::Arc;

use anyhow::Result;
use teloxide::{
    dispatching::Dispatcher,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::ParseMode,
    update_listeners,
    utils::command::BotCommands,
};
use tokio::time::Instant;

use crate::{
    config::AppConfig,
    emotion::Palette,
    infrastructure::shutdown::ShutdownListener,
    journal::{JournalService, SubmitError},
};

use super::{
    types::{AppState, BotResult, GeneralCommand},
    utils::{format_distribution, format_history, format_submit_reply},
};

pub struct TelegramService {
    bot: Bot,
    state: Arc<AppState>,
}

impl TelegramService {
    pub fn new(
        bot: Bot,
        config: Arc<AppConfig>,
        journal: Arc<JournalService>,
        palette: Palette,
    ) -> Self {
        let state = Arc::new(AppState {
            config,
            journal,
            palette,
        });
        Self { bot, state }
    }

    pub async fn run(&self, mut shutdown: ShutdownListener) -> Result<()> {
        self.sync_commands().await?;
        let me = self.bot.get_me().await?;
        if let Some(expected_username) = &self.state.config.bot_username {
            if me.username.as_deref() != Some(expected_username.as_str()) {
                tracing::warn!(
                    target: "telegram",
                    expected = expected_username.as_str(),
                    actual = ?me.username,
                    "환경변수 BOT_USERNAME과 실제 봇 계정이 일치하지 않습니다"
                );
            }
        }
        tracing::info!(
            target: "telegram",
            bot_id = me.id.0,
            username = ?me.username,
            "Telegram 봇 연결 완료"
        );

        let handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<GeneralCommand>()
                    .endpoint(Self::on_command),
            )
            .branch(dptree::endpoint(Self::on_plain_message));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.state.clone()])
            .default_handler(|update| async move {
                tracing::debug!(target: "telegram", ?update, "unhandled update");
            })
            .build();

        let listener = update_listeners::polling_default(self.bot.clone()).await;
        let shutdown_token = dispatcher.shutdown_token();
        let mut dispatcher_future = Box::pin(dispatcher.dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("update listener error"),
        ));
        let mut dispatcher_finished = false;

        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!("텔레그램 디스패처 종료 요청 수신");
                if let Ok(wait) = shutdown_token.shutdown() {
                    wait.await;
                }
            }
            _ = &mut dispatcher_future => {
                dispatcher_finished = true;
                tracing::info!("텔레그램 디스패처 종료 완료");
            }
        }

        if !dispatcher_finished {
            dispatcher_future.await;
        }

        Ok(())
    }

    /// A plain text message in a private chat is a journal submission.
    async fn on_plain_message(bot: Bot, msg: Message, state: Arc<AppState>) -> BotResult<()> {
        if !msg.chat.is_private() {
            return Ok(());
        }

        let text = msg.text().or_else(|| msg.caption()).unwrap_or("");
        match state.journal.submit(text).await {
            Ok(outcome) => {
                bot.send_message(msg.chat.id, format_submit_reply(&outcome, &state.palette))
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Err(SubmitError::EmptyInput) => {
                bot.send_message(msg.chat.id, "기록할 내용을 입력해주세요.")
                    .await?;
            }
            Err(SubmitError::Store(err)) => {
                tracing::error!(
                    target: "journal",
                    error = %err,
                    chat_id = msg.chat.id.0,
                    "entry save failed"
                );
                bot.send_message(
                    msg.chat.id,
                    "일기 저장에 실패했습니다. 잠시 후 다시 시도해주세요.",
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn on_command(
        bot: Bot,
        msg: Message,
        cmd: GeneralCommand,
        state: Arc<AppState>,
    ) -> BotResult<()> {
        match cmd {
            GeneralCommand::Start => {
                bot.send_message(
                    msg.chat.id,
                    "안녕하세요! 감정 일기 봇입니다.\n\
                     오늘 느낀 일을 메시지로 보내주시면 감정을 분석해서 기록해 드려요.\n\
                     /history 로 최근 일기를, /stats 로 감정 분포를 볼 수 있습니다.",
                )
                .await?;
            }
            GeneralCommand::Help => {
                bot.send_message(msg.chat.id, GeneralCommand::descriptions().to_string())
                    .await?;
            }
            GeneralCommand::History => {
                match state.journal.recent(state.config.history_page_size).await {
                    Ok(entries) => {
                        let tz = state.timezone();
                        bot.send_message(
                            msg.chat.id,
                            format_history(&entries, &state.palette, &tz),
                        )
                        .parse_mode(ParseMode::Html)
                        .await?;
                    }
                    Err(err) => {
                        tracing::error!(target: "journal", error = %err, "history read failed");
                        bot.send_message(msg.chat.id, "일기 조회 중 오류가 발생했습니다.")
                            .await?;
                    }
                }
            }
            GeneralCommand::Stats => match state.journal.distribution().await {
                Ok(counts) => {
                    bot.send_message(msg.chat.id, format_distribution(&counts, &state.palette))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(err) => {
                    tracing::error!(target: "journal", error = %err, "distribution read failed");
                    bot.send_message(msg.chat.id, "통계 조회 중 오류가 발생했습니다.")
                        .await?;
                }
            },
            GeneralCommand::Chatid => {
                bot.send_message(msg.chat.id, format!("현재 채팅 ID: {}", msg.chat.id))
                    .await?;
            }
            GeneralCommand::Ping => {
                let start = Instant::now();
                let sent = bot.send_message(msg.chat.id, "Pong 측정 중...").await?;
                let latency_secs = start.elapsed().as_secs_f64();
                bot.edit_message_text(
                    msg.chat.id,
                    sent.id,
                    format!("Pong! 응답 속도: {:.3}초", latency_secs),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn sync_commands(&self) -> BotResult<()> {
        self.bot
            .set_my_commands(GeneralCommand::bot_commands())
            .await?;
        tracing::info!(target: "telegram", "명령어 동기화 완료");
        Ok(())
    }
}
