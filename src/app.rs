//! 终端前端 - 编排层
//!
//! 逐行读取答题者输入，驱动 [`PageController`]。只负责展示，
//! 所有规则都在向导内部。
//!
//! 命令：`:back` 返回上一页，`:reload` 重新获取题目，`:quit` 退出。

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use crate::clients::SurveyClient;
use crate::config::Config;
use crate::error::WizardError;
use crate::models::PageIndex;
use crate::services::{CompletionGate, FileMarkerStore, ResultsAccess};
use crate::utils::logging::{log_page_banner, log_startup};
use crate::workflow::{PageController, Stage};

type Controller = PageController<SurveyClient, SurveyClient, FileMarkerStore>;

/// 一页作答的结果
enum PageInput {
    Answered,
    Back,
    Reload,
    Quit,
}

/// 应用主结构
pub struct App {
    controller: Controller,
    input: Lines<BufReader<Stdin>>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let client = SurveyClient::new(&config)?;
        let gate = CompletionGate::new(FileMarkerStore::new(&config.marker_file));

        Ok(Self {
            controller: PageController::new(client.clone(), client, gate),
            input: BufReader::new(tokio::io::stdin()).lines(),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        println!("Welcome! This survey has 6 pages. Press Enter to start.");
        if self.read_line().await?.is_none() {
            return Ok(());
        }

        if let Err(e) = self.controller.start().await {
            report(&e);
        }

        loop {
            let page = match self.controller.wizard().stage() {
                Stage::Completed => return self.show_results(),
                Stage::Page(page) => page,
            };

            if self.controller.wizard().needs_questions() {
                println!("Questions for page {} are not loaded. Press Enter to retry, or :quit.", page);
                match self.read_line().await?.as_deref().map(str::trim) {
                    None | Some(":quit") => return Ok(()),
                    _ => self.dispatch(PageInput::Reload).await,
                }
                continue;
            }

            let input = self.answer_page(page).await?;
            if matches!(input, PageInput::Quit) {
                info!("👋 答题者退出");
                return Ok(());
            }
            self.dispatch(input).await;
        }
    }

    async fn dispatch(&mut self, input: PageInput) {
        let result = match input {
            PageInput::Answered => self.controller.next().await,
            PageInput::Back => self.controller.back().await,
            PageInput::Reload => self.controller.reload().await,
            PageInput::Quit => return,
        };
        if let Err(e) = result {
            report(&e);
        }
    }

    /// 逐题读取答案
    async fn answer_page(&mut self, page: PageIndex) -> Result<PageInput> {
        let wizard = self.controller.wizard();
        log_page_banner(page, wizard.questions().len(), wizard.personality_hint());
        if let Some(hint) = wizard.personality_hint() {
            println!("Your personality code: {}", hint);
        }

        let prompts: Vec<String> = wizard
            .questions()
            .iter()
            .map(|q| q.text.clone())
            .collect();

        for (slot, prompt) in prompts.iter().enumerate() {
            println!("[{}/{}] {}", slot + 1, prompts.len(), prompt);
            let Some(line) = self.read_line().await? else {
                return Ok(PageInput::Quit);
            };
            match line.trim() {
                ":quit" => return Ok(PageInput::Quit),
                ":back" => return Ok(PageInput::Back),
                ":reload" => return Ok(PageInput::Reload),
                raw => {
                    if let Err(e) = self.controller.set_answer(slot, raw) {
                        report(&e);
                    }
                }
            }
        }
        Ok(PageInput::Answered)
    }

    fn show_results(&self) -> Result<()> {
        let store = self.controller.wizard().gate().store();
        match ResultsAccess::authorize(store).context("无法读取完成标记")? {
            Some(marker) => {
                println!("Thank you, {}! Your survey has been submitted.", marker.user_name);
                if let Some(hint) = self.controller.wizard().personality_hint() {
                    println!("Personality code: {}", hint);
                }
            }
            None => {
                warn!("⚠️ 完成标记缺失，结果页拒绝访问");
                println!("Results are unavailable. Please complete the survey first.");
            }
        }
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        self.input.next_line().await.context("读取输入失败")
    }
}

fn report(err: &WizardError) {
    warn!("⚠️ {}", err);
    println!("! {}", err.respondent_message());
}
