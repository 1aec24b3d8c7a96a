use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use seedgate_core::{Enclosure, FeedEntry, FeedError};

/// Parse an RSS 2.0 or Atom document into entries with their enclosures.
///
/// RSS enclosures come from `<enclosure url type>`, Atom ones from
/// `<link rel="enclosure" href type>`. Entries without a title get an empty one.
pub fn parse_feed(url: &str, xml: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    let malformed = |details: String| FeedError::Malformed {
        url: url.to_string(),
        details,
    };

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut in_title = false;
    let mut saw_element = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                saw_element = true;
                match e.local_name().as_ref() {
                    b"item" | b"entry" => current = Some(EntryBuilder::default()),
                    b"title" => in_title = current.is_some() && e.name().as_ref() == b"title",
                    _ => {
                        if let Some(entry) = current.as_mut() {
                            entry.push_enclosure(&e).map_err(malformed)?;
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                saw_element = true;
                if let Some(entry) = current.as_mut() {
                    entry.push_enclosure(&e).map_err(malformed)?;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry.build());
                    }
                    in_title = false;
                }
                b"title" => in_title = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let (true, Some(entry)) = (in_title, current.as_mut()) {
                    let text = e.unescape().map_err(|err| malformed(err.to_string()))?;
                    entry.title.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (true, Some(entry)) = (in_title, current.as_mut()) {
                    entry.title.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(malformed(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_element {
        return Err(malformed("document contains no elements".to_string()));
    }

    Ok(entries)
}

#[derive(Default)]
struct EntryBuilder {
    title: String,
    enclosures: Vec<Enclosure>,
}

impl EntryBuilder {
    fn push_enclosure(&mut self, element: &BytesStart) -> Result<(), String> {
        let url = match element.local_name().as_ref() {
            b"enclosure" => attribute(element, "url")?,
            b"link" => {
                if attribute(element, "rel")?.as_deref() != Some("enclosure") {
                    return Ok(());
                }
                attribute(element, "href")?
            }
            _ => return Ok(()),
        };

        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            self.enclosures.push(Enclosure {
                mime_type: attribute(element, "type")?.unwrap_or_default(),
                url: url.trim().to_string(),
            });
        }
        Ok(())
    }

    fn build(self) -> FeedEntry {
        FeedEntry {
            title: self.title.trim().to_string(),
            enclosures: self.enclosures,
        }
    }
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>, String> {
    match element
        .try_get_attribute(name)
        .map_err(|err| err.to_string())?
    {
        Some(attr) => {
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}
