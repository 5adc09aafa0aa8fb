use crate::{db::Message, include_res, res::escape};

/// One chat bubble; `me` decides which side it sits on.
pub(crate) fn msg_to_html(msg: &Message, me: i64) -> String {
    let (side, initial) = if msg.sender_id == me {
        ("mine", String::new())
    } else {
        ("theirs", msg.sender_username.chars().next().map(String::from).unwrap_or_default())
    };

    include_res!(str, "/pages/groups/message.html")
        .replace("{id}", &escape(&msg.id))
        .replace("{side}", side)
        .replace("{initial}", &escape(&initial))
        .replace("{sender}", &escape(&msg.sender_username))
        .replace("{text}", &escape(&msg.text))
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn msg(sender_id: i64, text: &str) -> Message {
        Message {
            id: "k1".to_owned(),
            sender_id,
            sender_username: "Charlie".to_owned(),
            group_id: 1,
            text: text.to_owned(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn others_get_an_initial() {
        let html = msg_to_html(&msg(3, "hey"), 1);
        assert!(html.contains("theirs"));
        assert!(html.contains(">C<"));
    }

    #[test]
    fn text_is_escaped() {
        let html = msg_to_html(&msg(1, "<b>bold</b>"), 1);
        assert!(html.contains("mine"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }
}
