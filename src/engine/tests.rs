#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::adapter::sites;
    use crate::config::EngineConfig;
    use crate::dom::{Dom, HtmlPage, NodeKey};

    const GRID: &str = r#"<html><body><div class="grid">
        <div data-testid="product-card-root" id="a">
            <div class="price-wrap"><span data-testid="product-card-price">199 ₽</span></div>
            <div data-testid="product-card-name">Сыр 250г</div>
        </div>
        <div data-testid="product-card-root" id="b">
            <div class="price-wrap"><span data-testid="product-card-price">89 ₽</span></div>
            <div data-testid="product-card-name">Молоко 1 л</div>
        </div>
    </div></body></html>"#;

    const NEW_CARD: &str = r#"<div data-testid="product-card-root" id="c">
        <div class="price-wrap"><span data-testid="product-card-price">120 ₽</span></div>
        <div data-testid="product-card-name">Вода 500 мл</div>
    </div>"#;

    fn engine() -> CardEngine<HtmlPage> {
        CardEngine::new(sites::perekrestok())
    }

    fn badges(page: &HtmlPage) -> Vec<String> {
        page.texts(r#"[data-testid="unit-price"]"#).unwrap()
    }

    fn key(page: &HtmlPage, selector: &str) -> NodeKey {
        page.query_all(selector).unwrap()[0]
    }

    #[test]
    fn test_scan_is_idempotent() {
        let mut page = HtmlPage::parse(GRID);
        let mut engine = engine();

        let first = engine.rescan(&mut page, Trigger::Init);
        assert_eq!(first.cards, 2);
        assert_eq!(first.rendered, 2);
        assert_eq!(badges(&page), vec!["796 ₽ за 1 кг", "89 ₽ за 1 л"]);

        let second = engine.rescan(&mut page, Trigger::Poll);
        assert_eq!(second.rendered, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(badges(&page).len(), 2);
        assert_eq!(engine.processed_count(), 2);
    }

    #[test]
    fn test_failing_card_does_not_stop_the_scan() {
        let mut page = HtmlPage::parse(&GRID.replace("89 ₽", "скоро"));
        let mut engine = engine();

        let report = engine.rescan(&mut page, Trigger::Init);
        assert_eq!(report.rendered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, vec![r#"price not recognized: "скоро""#]);
        assert_eq!(badges(&page), vec!["796 ₽ за 1 кг"]);

        let b = key(&page, "#b");
        assert_eq!(engine.failure(&b).map(|f| f.attempts), Some(1));

        // retried on every later trigger
        engine.rescan(&mut page, Trigger::Scroll);
        assert_eq!(engine.failure(&b).map(|f| f.attempts), Some(2));
    }

    #[test]
    fn test_card_is_badged_once_its_price_arrives() {
        let mut page = HtmlPage::parse(&GRID.replace(
            r#"<div class="price-wrap"><span data-testid="product-card-price">199 ₽</span></div>"#,
            r#"<div class="price-wrap"></div>"#,
        ));
        let mut engine = engine();

        let init = engine.rescan(&mut page, Trigger::Init);
        assert_eq!(init.rendered, 1);
        assert_eq!(init.skipped, 1);

        let wrap = key(&page, "#a .price-wrap");
        let added = page
            .insert_html(&wrap, r#"<span data-testid="product-card-price">199 ₽</span>"#)
            .unwrap();
        let report = engine.on_mutation(&mut page, &added);
        assert_eq!(report.trigger, Trigger::Mutation);
        assert_eq!(report.cards, 1);
        assert_eq!(report.rendered, 1);

        engine.rescan(&mut page, Trigger::Poll);
        assert_eq!(page.texts(r#"#a [data-testid="unit-price"]"#).unwrap(), vec!["796 ₽ за 1 кг"]);
    }

    #[test]
    fn test_failed_card_recovers_after_mutation() {
        let mut page = HtmlPage::parse(&GRID.replace("199 ₽", "скоро"));
        let mut engine = engine();
        engine.rescan(&mut page, Trigger::Init);

        let a = key(&page, "#a");
        assert!(engine.failure(&a).is_some());

        let stale = key(&page, r#"#a [data-testid="product-card-price"]"#);
        page.remove(&stale).unwrap();
        let wrap = key(&page, "#a .price-wrap");
        let added = page
            .insert_html(&wrap, r#"<span data-testid="product-card-price">199 ₽</span>"#)
            .unwrap();

        let report = engine.on_mutation(&mut page, &added);
        assert_eq!(report.rendered, 1);
        assert!(engine.failure(&a).is_none());
        assert!(engine.is_processed(&a));
        assert_eq!(badges(&page).len(), 2);
    }

    #[test]
    fn test_retry_cap() {
        let mut page = HtmlPage::parse(&GRID.replace("89 ₽", "скоро"));
        let mut engine = engine().with_max_attempts(Some(2));

        assert_eq!(engine.rescan(&mut page, Trigger::Init).failed, 1);
        assert_eq!(engine.rescan(&mut page, Trigger::Poll).failed, 1);

        let third = engine.rescan(&mut page, Trigger::Poll);
        assert_eq!(third.failed, 0);
        assert_eq!(third.skipped, 2);
        assert_eq!(engine.failure(&key(&page, "#b")).map(|f| f.attempts), Some(2));
    }

    #[test]
    fn test_mutation_with_nested_cards() {
        let mut page = HtmlPage::parse(GRID);
        let mut engine = engine();
        engine.rescan(&mut page, Trigger::Init);

        let grid = key(&page, ".grid");
        let wrapper = format!("<section>{}{}</section>", NEW_CARD, NEW_CARD.replace("id=\"c\"", "id=\"d\""));
        let added = page.insert_html(&grid, &wrapper).unwrap();

        let report = engine.on_mutation(&mut page, &added);
        assert_eq!(report.cards, 2);
        assert_eq!(report.rendered, 2);
        assert_eq!(badges(&page).len(), 4);
    }

    #[test]
    fn test_removed_cards_are_forgotten() {
        let mut page = HtmlPage::parse(GRID);
        let mut engine = engine();
        engine.rescan(&mut page, Trigger::Init);
        assert_eq!(engine.processed_count(), 2);

        let b = key(&page, "#b");
        page.remove(&b).unwrap();
        engine.rescan(&mut page, Trigger::Poll);
        assert_eq!(engine.processed_count(), 1);
        assert!(!engine.is_processed(&b));
    }

    #[test]
    fn test_invalid_card_selector_scans_nothing() {
        let mut adapter = sites::perekrestok();
        adapter.selectors.card = "[[broken".to_string();
        let mut engine: CardEngine<HtmlPage> = CardEngine::new(adapter);
        let mut page = HtmlPage::parse(GRID);

        let report = engine.rescan(&mut page, Trigger::Init);
        assert_eq!(report.cards, 0);
        assert!(badges(&page).is_empty());
    }

    fn session(observe_root: Option<&str>) -> Session<HtmlPage> {
        let mut adapter = sites::perekrestok();
        adapter.selectors.observe_root = observe_root.map(str::to_string);
        Session::new(CardEngine::new(adapter), &EngineConfig::default())
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(None);

        let init = session.start(&mut page, 0).unwrap();
        assert_eq!(init.trigger, Trigger::Init);
        assert_eq!(init.rendered, 2);
        assert!(session.start(&mut page, 10).is_none());
        assert_eq!(session.state(), SessionState::Running);
        assert!(session.is_observing());
        assert!(session.is_polling());
    }

    #[test]
    fn test_start_waits_for_ready() {
        let mut page = HtmlPage::loading(GRID);
        let mut session = session(None);

        assert!(session.start(&mut page, 0).is_none());
        assert_eq!(session.state(), SessionState::WaitingForReady);
        assert_eq!(session.next_deadline(), None);
        assert!(badges(&page).is_empty());

        page.mark_ready();
        let init = session.ready(&mut page, 50).unwrap();
        assert_eq!(init.rendered, 2);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn test_scroll_is_debounced() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(None);
        session.start(&mut page, 0);

        session.scroll(100);
        session.scroll(250);
        assert!(session.advance(&mut page, 500).is_empty());

        let reports = session.advance(&mut page, 550);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trigger, Trigger::Scroll);
        assert!(!session.scroll_pending());
    }

    #[test]
    fn test_next_deadline_is_the_earliest_timer() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(None);
        assert_eq!(session.next_deadline(), None);

        session.start(&mut page, 1000);
        assert_eq!(session.next_deadline(), Some(6000));

        session.scroll(1100);
        assert_eq!(session.next_deadline(), Some(1400));

        let reports = session.advance(&mut page, 1400);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trigger, Trigger::Scroll);
        assert_eq!(session.next_deadline(), Some(6000));

        // a timer that fires late runs one poll, not the missed backlog
        let reports = session.advance(&mut page, 23_000);
        assert_eq!(reports.len(), 1);
        assert_eq!(session.next_deadline(), Some(26_000));

        session.stop();
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_observer_failure_falls_back_to_poll() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(None);
        session.start(&mut page, 0);
        assert_eq!(session.observer(), &Observer::Body);

        session.disable_observer();
        assert!(!session.is_observing());
        assert!(session.is_polling());

        let grid = key(&page, ".grid");
        let added = page.insert_html(&grid, NEW_CARD).unwrap();
        assert!(session.mutation(&mut page, &added).is_none());

        session.scroll(200);
        let reports = session.advance(&mut page, 500);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].rendered, 1);
        assert_eq!(badges(&page).len(), 3);
    }

    #[test]
    fn test_observe_root_scope() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(Some(".grid"));
        session.start(&mut page, 0);
        assert_eq!(session.observer(), &Observer::Root(".grid".to_string()));
    }

    #[test]
    fn test_poll_picks_up_unobserved_cards() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(Some("#catalog"));
        session.start(&mut page, 0);
        assert!(!session.is_observing());

        let grid = key(&page, ".grid");
        let added = page.insert_html(&grid, NEW_CARD).unwrap();
        assert!(session.mutation(&mut page, &added).is_none());
        assert!(session.advance(&mut page, 4999).is_empty());

        let reports = session.advance(&mut page, 5000);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trigger, Trigger::Poll);
        assert_eq!(reports[0].rendered, 1);
        assert_eq!(badges(&page).len(), 3);
    }

    #[test]
    fn test_mutations_outside_observe_root_are_ignored() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(Some(".grid"));
        session.start(&mut page, 0);
        assert!(session.is_observing());

        let body = key(&page, "body");
        let outside = page.insert_html(&body, &NEW_CARD.replace("id=\"c\"", "id=\"x\"")).unwrap();
        assert!(session.mutation(&mut page, &outside).is_none());

        let grid = key(&page, ".grid");
        let inside = page.insert_html(&grid, NEW_CARD).unwrap();
        let report = session.mutation(&mut page, &inside).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(page.texts(r#"#c [data-testid="unit-price"]"#).unwrap(), vec!["240 ₽ за 1 л"]);
    }

    #[test]
    fn test_stop_disables_triggers() {
        let mut page = HtmlPage::parse(GRID);
        let mut session = session(None);
        session.start(&mut page, 0);
        session.scroll(100);
        session.stop();

        assert!(!session.is_observing());
        assert!(!session.is_polling());
        assert!(!session.scroll_pending());

        let grid = key(&page, ".grid");
        let added = page.insert_html(&grid, NEW_CARD).unwrap();
        assert!(session.mutation(&mut page, &added).is_none());
        session.scroll(200);
        assert!(session.advance(&mut page, 60_000).is_empty());
        assert_eq!(badges(&page).len(), 2);

        // a fresh start picks up what was missed
        let init = session.start(&mut page, 60_000).unwrap();
        assert_eq!(init.rendered, 1);
    }
}
