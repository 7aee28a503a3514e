use std::sync::Arc;

use chrono_tz::Tz;
use teloxide::utils::command::BotCommands;

use crate::{config::AppConfig, emotion::Palette, journal::JournalService};

pub type BotResult<T> = Result<T, teloxide::RequestError>;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub journal: Arc<JournalService>,
    pub palette: Palette,
}

impl AppState {
    pub fn timezone(&self) -> Tz {
        self.config.timezone.parse().unwrap_or(chrono_tz::Asia::Seoul)
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "사용 가능한 명령어:")]
pub enum GeneralCommand {
    #[command(description = "봇 소개 및 시작")]
    Start,
    #[command(description = "도움말")]
    Help,
    #[command(description = "최근 일기 목록")]
    History,
    #[command(description = "감정 분포 차트")]
    Stats,
    #[command(description = "현재 채팅 ID 확인")]
    Chatid,
    #[command(description = "응답 속도 측정")]
    Ping,
}
