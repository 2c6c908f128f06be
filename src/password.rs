use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const MIN_LEN: usize = 5;
pub const TTL: Duration = Duration::from_secs(600);

struct PasswordState {
    value: Option<String>,
    /// Поколение защищает от опоздавшего таймера предыдущего пароля
    epoch: u64,
    timer: Option<JoinHandle<()>>,
}

/// Единый на процесс временный пароль активации. Значение и его таймер
/// живут строго парой: установка перезапускает таймер, очистка гасит его.
#[derive(Clone)]
pub struct TempPassword {
    inner: Arc<Mutex<PasswordState>>,
    ttl: Duration,
}

impl TempPassword {
    pub fn new() -> Self {
        Self::with_ttl(TTL)
    }

    fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PasswordState {
                value: None,
                epoch: 0,
                timer: None,
            })),
            ttl,
        }
    }

    /// Короткие значения отклоняются без изменения состояния
    pub async fn set(&self, value: &str) -> bool {
        if value.chars().count() < MIN_LEN {
            return false;
        }
        let mut state = self.inner.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.epoch += 1;
        state.value = Some(value.to_string());

        let epoch = state.epoch;
        let inner = Arc::clone(&self.inner);
        let ttl = self.ttl;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = inner.lock().await;
            // пароль могли успеть сменить, тогда этот таймер уже чужой
            if state.epoch == epoch {
                state.value = None;
                state.timer = None;
                log::info!("🔑 Activation password expired");
            }
        }));
        true
    }

    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.epoch += 1;
        state.value = None;
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.value.is_some()
    }

    /// Точное сравнение, пароль не расходуется при проверке
    pub async fn verify(&self, input: &str) -> bool {
        match &self.inner.lock().await.value {
            Some(value) => value == input,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_verify_is_repeatable() {
        let pw = TempPassword::new();
        assert!(pw.set("abcde").await);
        assert!(pw.is_active().await);
        assert!(pw.verify("abcde").await);
        assert!(pw.verify("abcde").await);
        assert!(!pw.verify("Abcde").await); // регистр важен
    }

    #[tokio::test]
    async fn short_value_is_rejected_without_mutation() {
        let pw = TempPassword::new();
        assert!(!pw.set("abcd").await);
        assert!(!pw.is_active().await);

        assert!(pw.set("abcde").await);
        assert!(!pw.set("x").await);
        // прежний пароль остался действующим
        assert!(pw.verify("abcde").await);
    }

    #[tokio::test]
    async fn clear_drops_value_and_verify_fails() {
        let pw = TempPassword::new();
        pw.set("abcde").await;
        pw.clear().await;
        assert!(!pw.is_active().await);
        assert!(!pw.verify("abcde").await);
    }

    #[tokio::test]
    async fn value_expires_by_timer() {
        let pw = TempPassword::with_ttl(Duration::from_millis(40));
        pw.set("abcde").await;
        assert!(pw.is_active().await);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!pw.is_active().await);
        assert!(!pw.verify("abcde").await);
    }

    #[tokio::test]
    async fn replacing_password_cancels_old_timer() {
        let pw = TempPassword::with_ttl(Duration::from_millis(80));
        pw.set("first_pw").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        pw.set("second_pw").await;
        // старый таймер сработал бы здесь, но новый пароль должен жить
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pw.verify("second_pw").await);
        assert!(!pw.verify("first_pw").await);
    }
}
