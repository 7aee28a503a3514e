use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use teloxide::prelude::*;
use tokio::time::timeout;

use crate::{
    classifier::HostedClassifier,
    config::AppConfig,
    emotion::{Normalizer, NormalizerConfig, OverrideRule, Palette},
    infrastructure::{
        directories::ResolvedPaths, notifier::notify_admin_group, shutdown::Shutdown,
    },
    journal::JournalService,
    store::{self, EntryRepository},
    telegram::TelegramService,
};

pub struct MoodlogApp {
    _paths: ResolvedPaths,
    telegram: TelegramService,
    entries: Arc<EntryRepository>,
    shutdown: Shutdown,
    config: Arc<AppConfig>,
    bot: Bot,
}

impl MoodlogApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = store::init_pool(&paths.db_path).await?;
        let entries = Arc::new(EntryRepository::new(pool));

        let http_client = Client::builder()
            .user_agent(format!("moodlog-rust/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let classifier = Arc::new(HostedClassifier::new(
            http_client,
            config.classifier.clone(),
        ));

        let normalizer = Normalizer::new(normalizer_config(&config));
        let palette = Palette::new(
            config.emotion.palette.iter().cloned(),
            config.emotion.fallback_swatch.clone(),
        );
        let journal = Arc::new(JournalService::new(classifier, entries.clone(), normalizer));

        let bot = Bot::new(&config.telegram_bot_token);
        let telegram = TelegramService::new(bot.clone(), config.clone(), journal, palette);

        Ok(Self {
            _paths: paths,
            telegram,
            entries,
            shutdown,
            config,
            bot,
        })
    }

    pub async fn run(self) -> Result<()> {
        let MoodlogApp {
            _paths: _,
            telegram,
            entries,
            shutdown,
            config,
            bot,
        } = self;

        tracing::info!("감정 일기 봇 (Rust) 시작");
        notify_admin_group(&bot, config.as_ref(), "감정 일기 봇이 시작되었습니다.").await;

        let mut shutdown_listener = shutdown.subscribe();
        let shutdown_timeout = Duration::from_secs(5);
        let mut telegram_future = Box::pin(telegram.run(shutdown.subscribe()));
        let mut telegram_completed = false;

        tokio::select! {
            _ = shutdown_listener.notified() => {
                tracing::info!("종료 신호 감지 (CTRL+C / SIGTERM)");
            }
            res = &mut telegram_future => {
                telegram_completed = true;
                if let Err(err) = res {
                    tracing::error!(?err, "Telegram dispatcher 종료 중 오류");
                } else {
                    tracing::info!("Telegram dispatcher 정상 종료");
                }
            }
        }

        shutdown.trigger();

        if !telegram_completed {
            let wait = tokio::time::sleep(shutdown_timeout);
            tokio::pin!(wait);
            tokio::select! {
                res = &mut telegram_future => {
                    if let Err(err) = res {
                        tracing::error!(?err, "Telegram dispatcher 종료 중 오류");
                    }
                }
                _ = &mut wait => {
                    tracing::warn!(
                        target: "telegram",
                        "Telegram dispatcher did not stop within {:?}; forcing exit",
                        shutdown_timeout
                    );
                }
            }
        }

        if timeout(shutdown_timeout, entries.close()).await.is_err() {
            tracing::warn!(
                target: "store",
                "저장소 정리가 {:?} 내에 완료되지 않았습니다.",
                shutdown_timeout
            );
        }

        tracing::info!("봇 종료 완료");
        notify_admin_group(&bot, config.as_ref(), "감정 일기 봇이 종료되었습니다.").await;
        Ok(())
    }
}

fn normalizer_config(config: &AppConfig) -> NormalizerConfig {
    NormalizerConfig {
        label_map: config.emotion.label_map.iter().cloned().collect(),
        overrides: config
            .emotion
            .overrides
            .iter()
            .map(|(trigger, emotion)| OverrideRule {
                trigger: trigger.clone(),
                emotion: emotion.clone(),
                confidence: config.emotion.override_confidence,
            })
            .collect(),
        default_emotion: config.emotion.default_emotion.clone(),
    }
}
