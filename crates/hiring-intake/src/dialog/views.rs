//! All user-facing copy and keyboards in one place, including the
//! "не указано" substitution for optional site fields.

use chrono::FixedOffset;

use super::domain::{ApplicationCard, KeyboardButton, OutboundMessage, RankedSite};
use crate::geo::format_distance_km;

pub const BTN_SHARE_LOCATION: &str = "📍 Отправить местоположение";
pub const BTN_BACK_TO_VACANCIES: &str = "⬅️ Назад к выбору вакансии";
pub const BTN_BACK: &str = "⬅️ Назад";
pub const BTN_APPLY: &str = "✅ Откликнуться";
pub const BTN_BACK_TO_SHOPS: &str = "⬅️ Назад к списку магазинов";
pub const BTN_SHARE_CONTACT: &str = "📱 Поделиться номером телефона";
pub const BTN_CONFIRM: &str = "✅ Да, отправить отклик";
pub const BTN_REVISE: &str = "❌ Нет, изменить";

const UNSPECIFIED: &str = "не указано";

/// Staff notices carry Moscow local time.
const MOSCOW_UTC_OFFSET_HOURS: i32 = 3;

fn unspecified(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => UNSPECIFIED,
    }
}

pub fn welcome() -> OutboundMessage {
    OutboundMessage::plain("👋 Добро пожаловать в бот по подбору вакансий!")
}

pub fn loading_vacancies() -> OutboundMessage {
    OutboundMessage::plain("⏳ Загружаем список вакансий...")
}

/// Vacancies laid out two per row, the way the original keyboard reads.
pub fn vacancy_prompt(vacancies: &[String]) -> OutboundMessage {
    let rows = vacancies
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|name| KeyboardButton::text(name.as_str()))
                .collect()
        })
        .collect();
    OutboundMessage::with_keyboard("Выберите вакансию:", rows)
}

pub fn vacancy_rejected() -> OutboundMessage {
    OutboundMessage::plain("❌ Пожалуйста, выберите вакансию из списка.")
}

fn location_keyboard() -> Vec<Vec<KeyboardButton>> {
    vec![
        vec![KeyboardButton::share_location(BTN_SHARE_LOCATION)],
        vec![KeyboardButton::text(BTN_BACK_TO_VACANCIES)],
    ]
}

pub fn location_prompt(vacancy: &str) -> OutboundMessage {
    OutboundMessage::with_keyboard(
        format!(
            "✅ Выбрана вакансия: {vacancy}\n\n\
             Отправьте ваше местоположение или введите адрес:\nГород, Улица, Дом"
        ),
        location_keyboard(),
    )
}

pub fn location_reprompt() -> OutboundMessage {
    OutboundMessage::with_keyboard(
        "Отправьте местоположение или введите адрес:",
        location_keyboard(),
    )
}

pub fn geocoding_notice() -> OutboundMessage {
    OutboundMessage::plain("📍 Определяю координаты по адресу...")
}

pub fn geocode_failed() -> OutboundMessage {
    OutboundMessage::with_keyboard(
        "❌ Не удалось определить координаты по адресу.\n\n\
         Пожалуйста, проверьте формат адреса или используйте кнопку для отправки местоположения.",
        location_keyboard(),
    )
}

pub fn searching_notice(vacancy: &str) -> OutboundMessage {
    OutboundMessage::plain(format!("🔍 Ищу магазины с вакансией \"{vacancy}\"..."))
}

pub fn shops_not_found(vacancy: &str) -> OutboundMessage {
    OutboundMessage::with_keyboard(
        format!(
            "❌ Не найдено магазинов с вакансией \"{vacancy}\" в вашем регионе.\n\n\
             Попробуйте указать другое местоположение."
        ),
        location_keyboard(),
    )
}

/// "1. Город, адрес (450 м)": what the user taps and what the engine
/// parses back.
pub fn shop_button_label(index: usize, shop: &RankedSite) -> String {
    format!(
        "{}. {} ({})",
        index + 1,
        shop.item.short_address(),
        format_distance_km(shop.distance_km)
    )
}

pub fn shop_list(vacancy: &str, shops: &[RankedSite]) -> OutboundMessage {
    let mut rows: Vec<Vec<KeyboardButton>> = shops
        .iter()
        .enumerate()
        .map(|(index, shop)| vec![KeyboardButton::text(shop_button_label(index, shop))])
        .collect();
    rows.push(vec![KeyboardButton::text(BTN_BACK)]);

    OutboundMessage::with_keyboard(
        format!(
            "🏪 Найдено *{}* ближайших магазинов с вакансией \"{vacancy}\":\n\n\
             Выберите магазин для просмотра деталей:",
            shops.len()
        ),
        rows,
    )
}

pub fn shop_details(shop: &RankedSite) -> OutboundMessage {
    let site = &shop.item;
    OutboundMessage::with_keyboard(
        format!(
            "🏪 *{}*\n\n\
             📌 *Вакансия:* {}\n\
             💰 *Тариф:* {}\n\
             📅 *График:* {}\n\
             🎂 *Возраст:* {}\n\
             🎁 *Описание:* {}\n\n\
             📍 *Адрес:* {}",
            site.short_address(),
            site.vacancy,
            unspecified(site.rate.as_deref()),
            unspecified(site.schedule.as_deref()),
            unspecified(site.age_requirement.as_deref()),
            site.description.as_deref().unwrap_or("нет"),
            site.full_address.as_deref().unwrap_or(&site.street),
        ),
        vec![vec![
            KeyboardButton::text(BTN_APPLY),
            KeyboardButton::text(BTN_BACK_TO_SHOPS),
        ]],
    )
}

pub fn fio_prompt() -> OutboundMessage {
    OutboundMessage::plain(
        "Для оформления отклика введите ваши ФИО (Фамилия Имя Отчество):\n\
         *Пример:* Иванов Иван Иванович",
    )
}

pub fn fio_rejected() -> OutboundMessage {
    OutboundMessage::plain("❌ Пожалуйста, введите полные ФИО (Фамилия Имя Отчество)")
}

pub fn phone_prompt() -> OutboundMessage {
    OutboundMessage::with_keyboard(
        "✅ ФИО сохранено.\n\n\
         Теперь нажмите кнопку, чтобы поделиться номером телефона, \
         или введите его вручную в формате 79XXXXXXXXX:",
        vec![vec![KeyboardButton::share_contact(BTN_SHARE_CONTACT)]],
    )
}

pub fn phone_rejected() -> OutboundMessage {
    OutboundMessage::plain(
        "❌ Неверный формат номера.\n\
         Пожалуйста, введите номер в формате 79XXXXXXXXX (например, 79001234567)\n\
         Или нажмите кнопку \"Поделиться номером телефона\".",
    )
}

pub fn foreign_contact_rejected() -> OutboundMessage {
    OutboundMessage::plain("❌ Пожалуйста, поделитесь своим номером телефона, а не чужим.")
}

pub fn age_prompt() -> OutboundMessage {
    OutboundMessage::plain("Сколько вам полных лет?")
}

pub fn age_rejected() -> OutboundMessage {
    OutboundMessage::plain("❌ Пожалуйста, введите корректный возраст цифрами (от 14 до 100).")
}

pub fn confirmation_summary(
    vacancy: &str,
    shop: &RankedSite,
    full_name: &str,
    phone: &str,
    age: u8,
) -> OutboundMessage {
    OutboundMessage::with_keyboard(
        format!(
            "✅ *Данные для отклика:*\n\n\
             📌 *Вакансия:* {vacancy}\n\
             🏪 *Магазин:* {}\n\
             👤 *ФИО:* {full_name}\n\
             📱 *Телефон:* {phone}\n\
             🎂 *Возраст:* {age}\n\n\
             Всё верно?",
            shop.item.short_address(),
        ),
        vec![
            vec![KeyboardButton::text(BTN_CONFIRM)],
            vec![KeyboardButton::text(BTN_REVISE)],
        ],
    )
}

pub fn application_sent() -> OutboundMessage {
    OutboundMessage::plain(
        "🎉 Ваш отклик отправлен менеджеру!\n\n\
         С вами свяжутся в ближайшее время.\n\n\
         Для нового поиска нажмите /start",
    )
}

pub fn revise_notice() -> OutboundMessage {
    OutboundMessage::plain("Начните заново с /start")
}

pub fn cancel_notice() -> OutboundMessage {
    OutboundMessage::plain("❌ Операция отменена. Нажмите /start для начала.")
}

pub fn help_text() -> OutboundMessage {
    OutboundMessage::plain(
        "📋 *Помощь*\n\n\
         */start* - Начать поиск вакансии\n\
         */help* - Эта справка\n\
         */cancel* - Отменить текущую операцию\n\n\
         *Процесс работы:*\n\
         1️⃣ Выберите вакансию\n\
         2️⃣ Укажите местоположение\n\
         3️⃣ Выберите магазин\n\
         4️⃣ Введите ФИО\n\
         5️⃣ Предоставьте номер телефона\n\
         6️⃣ Откликнитесь на вакансию",
    )
}

pub fn finish_current_step() -> OutboundMessage {
    OutboundMessage::plain("Пожалуйста, завершите текущий шаг или начните заново с /start")
}

pub fn apology() -> OutboundMessage {
    OutboundMessage::plain("⚠️ Произошла ошибка. Попробуйте еще раз /start")
}

pub fn expiry_notice() -> OutboundMessage {
    OutboundMessage::plain("Для нового поиска нажмите /start")
}

/// The staff-channel notice for a confirmed application.
pub fn application_notice(card: &ApplicationCard) -> String {
    let site = &card.site.item;
    let moscow = FixedOffset::east_opt(MOSCOW_UTC_OFFSET_HOURS * 3600)
        .map(|offset| card.submitted_at.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| card.submitted_at.format("%d.%m.%Y %H:%M").to_string());

    format!(
        "🆕 *Новый отклик на вакансию*\n\n\
         🏢 *Проект:* {}\n\n\
         📌 *Вакансия:* {}\n\
         🏪 *Магазин:* {}\n\
         📍 *Полный адрес:* {}\n\
         📏 *Расстояние:* {}\n\n\
         👤 *ФИО:* {}\n\
         🎂 *Возраст кандидата:* {}\n\
         📱 *Телефон:* {}\n\
         🔗 *Telegram:* [Ссылка на профиль](tg://user?id={})\n\n\
         💰 *Тариф:* {}\n\
         📅 *График:* {}\n\
         🎂 *Возраст:* {}\n\
         🕐 *Время отклика:* {}",
        unspecified(site.project.as_deref()),
        card.vacancy,
        site.short_address(),
        site.full_address.as_deref().unwrap_or(&site.street),
        format_distance_km(card.site.distance_km),
        card.full_name,
        card.age,
        card.phone,
        card.applicant.0,
        unspecified(site.rate.as_deref()),
        unspecified(site.schedule.as_deref()),
        unspecified(site.age_requirement.as_deref()),
        moscow,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::domain::{ReplyMarkup, SiteRecord, UserId};
    use crate::geo::Coordinate;
    use chrono::{TimeZone, Utc};

    fn ranked_site() -> RankedSite {
        RankedSite {
            item: SiteRecord {
                city: "Москва".to_string(),
                street: "ул. Тверская, 1".to_string(),
                full_address: None,
                vacancy: "Кассир".to_string(),
                rate: None,
                schedule: Some("5/2".to_string()),
                age_requirement: None,
                description: None,
                project: None,
                coordinate: Coordinate::new(55.7558, 37.6176),
            },
            distance_km: 0.45,
        }
    }

    #[test]
    fn vacancy_keyboard_packs_two_per_row() {
        let vacancies: Vec<String> = ["Кассир", "Повар", "Пекарь"]
            .into_iter()
            .map(String::from)
            .collect();
        let message = vacancy_prompt(&vacancies);
        let ReplyMarkup::Keyboard(rows) = message.markup else {
            panic!("expected a keyboard");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[1].len(), 1);
    }

    #[test]
    fn shop_button_carries_index_address_and_distance() {
        let label = shop_button_label(0, &ranked_site());
        assert_eq!(label, "1. Москва, ул. Тверская, 1 (450 м)");
    }

    #[test]
    fn missing_site_fields_render_as_unspecified() {
        let message = shop_details(&ranked_site());
        assert!(message.text.contains("💰 *Тариф:* не указано"));
        assert!(message.text.contains("📅 *График:* 5/2"));
        assert!(message.text.contains("🎁 *Описание:* нет"));
        assert!(message.text.contains("📍 *Адрес:* ул. Тверская, 1"));
    }

    #[test]
    fn application_notice_contains_all_form_fields() {
        let card = ApplicationCard {
            vacancy: "Кассир".to_string(),
            site: ranked_site(),
            full_name: "Иванов Иван Иванович".to_string(),
            phone: "79001234567".to_string(),
            age: 25,
            applicant: UserId(42),
            submitted_at: Utc.with_ymd_and_hms(2026, 8, 6, 9, 30, 0).single().expect("valid"),
        };

        let notice = application_notice(&card);
        for needle in [
            "Кассир",
            "Москва, ул. Тверская, 1",
            "Иванов Иван Иванович",
            "79001234567",
            "25",
            "tg://user?id=42",
            "450 м",
            "12:30", // Moscow local time for 09:30 UTC
        ] {
            assert!(notice.contains(needle), "missing {needle:?} in {notice}");
        }
    }
}
